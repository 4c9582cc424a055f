//! Item commands.

use crate::session::Session;
use crate::Format;
use todosync_core::{Color, Item, ItemId, LocalStore, Priority, Timestamp};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Prints every cached item.
pub fn list(session: &Session, format: Format) -> CommandResult {
    let items = session.storage().list();
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&items)?),
        Format::Text if items.is_empty() => println!("No items"),
        Format::Text => {
            for item in &items {
                println!("{}", describe(item));
            }
        }
    }
    Ok(())
}

/// Prints one item.
pub fn get(session: &Session, id: ItemId, format: Format) -> CommandResult {
    let item = session
        .storage()
        .get(id)
        .ok_or_else(|| format!("Item {id} not found"))?;
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&item)?),
        Format::Text => println!("{}", describe(&item)),
    }
    Ok(())
}

/// Creates an item and prints its id.
pub fn add(
    session: &Session,
    text: String,
    priority: Priority,
    deadline: Option<i64>,
    color: Option<Color>,
) -> CommandResult {
    let mut item = Item::new(text).with_priority(priority);
    if let Some(deadline) = deadline {
        item = item.with_deadline(Timestamp::from_secs(deadline));
    }
    if let Some(color) = color {
        item = item.with_color(color);
    }

    let id = item.id;
    session.storage().add(item);
    println!("{id}");
    Ok(())
}

/// Marks an item completed.
pub fn done(session: &Session, id: ItemId) -> CommandResult {
    let item = cached(session, id)?;
    let changed_at = Timestamp::now().max(item.changed_at);
    let updated = Item {
        changed_at,
        ..item.with_done(true)
    };
    replace(session, id, updated)
}

/// Replaces an item's text.
pub fn edit(session: &Session, id: ItemId, text: String) -> CommandResult {
    let updated = cached(session, id)?.edited(text);
    replace(session, id, updated)
}

/// Deletes an item.
pub fn remove(session: &Session, id: ItemId) -> CommandResult {
    if !session.storage().remove(id) {
        return Err(format!("Item {id} not found").into());
    }
    println!("Removed {id}");
    Ok(())
}

// Reads straight from the cache; these lookups feed a write and should not
// schedule a consistency check of their own.
fn cached(session: &Session, id: ItemId) -> Result<Item, Box<dyn std::error::Error>> {
    session
        .storage()
        .local()
        .get(id)
        .ok_or_else(|| format!("Item {id} not found").into())
}

fn replace(session: &Session, id: ItemId, item: Item) -> CommandResult {
    if !session.storage().update(id, item) {
        return Err(format!("Item {id} not found").into());
    }
    println!("Updated {id}");
    Ok(())
}

fn describe(item: &Item) -> String {
    let mut line = format!(
        "{} [{}] {}",
        item.id,
        if item.done { "x" } else { " " },
        item.text
    );
    let mut extras = Vec::new();
    if item.priority != Priority::Normal {
        extras.push(item.priority.to_string());
    }
    if let Some(deadline) = item.deadline {
        extras.push(format!("due {deadline}"));
    }
    if let Some(color) = item.color {
        extras.push(color.to_hex());
    }
    if !extras.is_empty() {
        line.push_str(&format!(" ({})", extras.join(", ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_plain_item() {
        let item = Item::new("buy milk");
        assert_eq!(describe(&item), format!("{} [ ] buy milk", item.id));
    }

    #[test]
    fn describe_decorated_item() {
        let item = Item::new("file taxes")
            .with_priority(Priority::Important)
            .with_deadline(Timestamp::from_secs(1_700_000_000))
            .with_color(Color::rgb(255, 0, 0))
            .with_done(true);
        assert_eq!(
            describe(&item),
            format!(
                "{} [x] file taxes (important, due 1700000000, #FF0000)",
                item.id
            )
        );
    }
}
