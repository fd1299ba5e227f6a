pub const USAGE: &str = "Usage: tlps [script]";

const BLOCK_KEYWORDS: &[&str] = &["def", "class", "if", "elseif", "else", "fun"];

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CommandLineOptions {
    pub file: Option<String>,
    pub debug: bool,
    pub help: bool,
    /// Positional arguments beyond the script path; any at all is a usage error.
    pub extra: Vec<String>,
}

impl CommandLineOptions {
    pub fn parse() -> Self {
        Self::parse_from(std::env::args().skip(1))
    }

    pub fn parse_from<I: IntoIterator<Item = String>>(args: I) -> Self {
        let mut options = CommandLineOptions::default();

        for arg in args {
            match arg.as_str() {
                "-d" | "--debug" => options.debug = true,
                "-h" | "--help" => options.help = true,
                _ => {
                    if options.file.is_none() {
                        options.file = Some(arg);
                    } else {
                        options.extra.push(arg);
                    }
                }
            }
        }

        options
    }

    pub fn is_usage_error(&self) -> bool {
        !self.extra.is_empty()
    }
}

/// The interactive prompt, depending on whether an entry is still open.
pub fn prompt(in_block: bool) -> &'static str {
    if in_block {
        "... "
    } else {
        ">>> "
    }
}

/// Whether `line` keeps an interactive entry open: indented lines and lines
/// starting with a block-introducing keyword do.
pub fn continues_block(line: &str) -> bool {
    if line.starts_with(char::is_whitespace) && !line.trim().is_empty() {
        return true;
    }

    let first_word = line.split(|c: char| !c.is_alphanumeric() && c != '_').next().unwrap_or_default();
    BLOCK_KEYWORDS.contains(&first_word)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_script_and_flags() {
        let options = CommandLineOptions::parse_from(args(&["-d", "main.lox"]));
        assert_eq!(options.file.as_deref(), Some("main.lox"));
        assert!(options.debug);
        assert!(!options.help);
        assert!(!options.is_usage_error());

        let options = CommandLineOptions::parse_from(args(&[]));
        assert_eq!(options, CommandLineOptions::default());
    }

    #[test]
    fn too_many_scripts_is_a_usage_error() {
        let options = CommandLineOptions::parse_from(args(&["a.lox", "b.lox"]));
        assert!(options.is_usage_error());
        assert_eq!(options.extra, vec!["b.lox".to_string()]);
    }

    #[test]
    fn prompts() {
        assert_eq!(prompt(false), ">>> ");
        assert_eq!(prompt(true), "... ");
    }

    #[test]
    fn block_continuation() {
        assert!(continues_block("fun add(a, b) {"));
        assert!(continues_block("class Foo {"));
        assert!(continues_block("if(x) {"));
        assert!(continues_block("else {"));
        assert!(continues_block("    return a + b;"));
        assert!(continues_block("\tprint a;"));

        assert!(!continues_block("}"));
        assert!(!continues_block(""));
        assert!(!continues_block("   "));
        assert!(!continues_block("classy = 1;"));
        assert!(!continues_block("print(1);"));
    }
}
