//! Decode-key command implementation.

use super::{parse_key, print_json, CommandResult, Format};
use synkit_core::KeyPath;

/// Renders the contents of a key as text.
pub fn describe(key: &KeyPath) -> String {
    let decoded = key.decode();
    let mut out = format!(
        "application: {}\nnamespace:   {}\npath:        {}\n",
        decoded.application,
        decoded.namespace,
        key.path_string()
    );
    for (depth, element) in decoded.elements.iter().enumerate() {
        let identity = match (element.id(), element.name()) {
            (Some(id), _) => format!("id {id}"),
            (None, Some(name)) => format!("name {name:?}"),
            (None, None) => "incomplete".to_string(),
        };
        out.push_str(&format!("  {depth}: {} ({identity})\n", element.kind()));
    }
    out
}

/// Runs the decode-key command.
pub fn run(encoded: &str, format: Format) -> CommandResult<()> {
    let key = parse_key(encoded)?;
    match format {
        Format::Json => print_json(key.decode())?,
        Format::Text => {
            print!("{}", describe(&key));
            if let Ok(raw) = synkit_codec::decode(key.as_str()) {
                println!("raw:         {raw:?}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_shows_every_ancestor() {
        let parent = KeyPath::from_path("Person", 42u64, None, Some("music")).unwrap();
        let child = KeyPath::from_path("Song", "imagine", Some(&parent), None).unwrap();

        let text = describe(&child);
        assert!(text.contains("namespace:   music"));
        assert!(text.contains("0: Person (id 42)"));
        assert!(text.contains("1: Song (name \"imagine\")"));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_key("not a key!").is_err());
    }
}
