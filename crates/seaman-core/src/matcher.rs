//! Tokenizing of chat text addressed to the bot.
//!
//! The bot is normally `@mentioned` and then given a command, so leading
//! mention tokens are dropped before the command word is read. Resolution
//! against registered names lives in
//! [`CommandRegistry::resolve`](crate::registry::CommandRegistry::resolve).

/// Returns `true` for a mention token: `<@U123>`, `<@U123|name>`, `<!here>`
/// style escapes, or a plain `@name`.
fn is_mention(token: &str) -> bool {
    if token.starts_with("<@") || token.starts_with("<!") {
        return token.ends_with('>');
    }
    token.len() > 1 && token.starts_with('@')
}

/// Splits text on whitespace after removing leading mentions.
///
/// # Examples
///
/// ```
/// use seaman_core::matcher::tokenize;
///
/// assert_eq!(tokenize("<@U0BOT> track  list"), vec!["track", "list"]);
/// assert_eq!(tokenize("@bot version"), vec!["version"]);
/// assert!(tokenize("<@U0BOT>").is_empty());
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .skip_while(|t| is_mention(t))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_strip_slack_mention() {
        assert_eq!(tokenize("<@U123ABC> help"), vec!["help"]);
    }

    #[test]
    fn test_should_strip_labelled_mention() {
        assert_eq!(tokenize("<@U123|seaman> help"), vec!["help"]);
    }

    #[test]
    fn test_should_strip_several_leading_mentions() {
        assert_eq!(tokenize("<@U1> <@U2> version"), vec!["version"]);
    }

    #[test]
    fn test_should_keep_mentions_after_command() {
        assert_eq!(tokenize("<@U1> notify <@U2>"), vec!["notify", "<@U2>"]);
    }

    #[test]
    fn test_should_keep_text_without_mention() {
        assert_eq!(tokenize("track list"), vec!["track", "list"]);
    }

    #[test]
    fn test_should_not_treat_bare_at_sign_as_mention() {
        assert_eq!(tokenize("@ help"), vec!["@", "help"]);
    }

    #[test]
    fn test_should_collapse_newlines_and_tabs() {
        assert_eq!(tokenize("@bot\ttrack\nlist  "), vec!["track", "list"]);
    }

    #[test]
    fn test_should_return_empty_for_blank_text() {
        assert!(tokenize("   ").is_empty());
    }
}
