//! Reply texts. Everything the bot says is plain text.

use hanbot_core::{CommandEntry, ContentTable, Restaurant, RestaurantName};

pub const GREETING: &str = "I'm Sorry I didn't recognize that could you try something else? If you need a list of commands simply type han !help.";

pub const GTFO: &str = "Maybe you should try fucking yourself?";

pub const NOT_FOUND: &str = "I can not seem to find what you named. ";

pub const EMPTY_LUNCH_LIST: &str = "There are no restaurants on the lunch list yet. Add one with han !lunchadd name:restaurantnamehere:";

pub const EMPTY_HELP: &str = "I don't have any commands written down right now.";

pub fn suggestion(restaurant: &str) -> String {
    format!("I am thinking {restaurant}")
}

pub fn help_line(entry: &CommandEntry) -> String {
    format!("Command: {} Use: {} Example Use: {}", entry.prompt, entry.usage, entry.example)
}

/// The stored name, or `None` for a blank row Slack would refuse to post.
pub fn lunch_line(restaurant: &Restaurant) -> Option<String> {
    let name = restaurant.name.trim();
    (!name.is_empty()).then(|| name.to_owned())
}

/// Usage hint for a missing or malformed `name:<value>:` tag. `verb` is
/// the action the user attempted ("add" or "delete").
pub fn tag_hint(verb: &str) -> String {
    format!(
        "Sorry you need to include a name otherwise I cant {verb} that. Make sure to use the name tag name:restaurantnamehere:  "
    )
}

pub fn added(name: &RestaurantName) -> String {
    format!(
        "I have added the {name} into the database! Also reset the number of uses for each location"
    )
}

pub fn already_listed(name: &RestaurantName) -> String {
    format!("{name} is already on the lunch list, so I left everything as it was.")
}

pub fn deleted(name: &RestaurantName) -> String {
    format!("I have deleted {name} from the database!")
}

pub fn nothing_to_pick(table: ContentTable) -> String {
    match table {
        ContentTable::Jokes => "I'm fresh out of jokes. Somebody needs to teach me some.".to_owned(),
        ContentTable::Restaurants => {
            "I have nowhere to suggest. Add a place with han !lunchadd name:restaurantnamehere:"
                .to_owned()
        }
        ContentTable::Bandito => format!("I have nothing to pick from in {table}."),
    }
}

/// First-run greeting posted to the first channel the bot can see.
pub fn welcome(bot_name: &str) -> String {
    format!(
        "Hi guys, roundhouse-kick anyone?\n I can tell jokes, but very honest ones. Just say `Han` or `{bot_name}` to invoke me!"
    )
}

#[cfg(test)]
mod tests {
    use hanbot_core::{CommandEntry, RestaurantName};

    use super::{added, help_line, suggestion, tag_hint, welcome};

    #[test]
    fn help_lines_name_every_field() {
        let entry = CommandEntry {
            prompt: "!gtfo".to_owned(),
            usage: "Tells me to go away".to_owned(),
            example: "han !gtfo".to_owned(),
        };

        assert_eq!(
            help_line(&entry),
            "Command: !gtfo Use: Tells me to go away Example Use: han !gtfo"
        );
    }

    #[test]
    fn confirmations_use_the_normalized_name() {
        let name = RestaurantName::parse("Tonys").expect("name");

        assert!(added(&name).contains("TONYS"));
        assert_eq!(suggestion("TONYS"), "I am thinking TONYS");
    }

    #[test]
    fn tag_hint_mentions_the_attempted_action() {
        assert!(tag_hint("delete").contains("cant delete that"));
        assert!(tag_hint("add").contains("name:restaurantnamehere:"));
    }

    #[test]
    fn welcome_mentions_the_bot_name() {
        assert!(welcome("han_bot").contains("`han_bot`"));
    }
}
