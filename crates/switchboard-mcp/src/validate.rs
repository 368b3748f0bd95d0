//! Allow-list validation for subprocess launch configurations.
//!
//! Applied when stdio servers are created or updated, before anything is
//! persisted; connect-time code trusts what made it into the store. The
//! checks are substring-based and deliberately blunt: commands outside the
//! runtime allow-list and arguments carrying shell metacharacters are
//! rejected outright, with no escaping or quoting analysis.

/// Commands a stdio server is allowed to launch.
///
/// These are the script runtimes MCP servers ship on; the comparison is
/// against the basename, so absolute paths to any of them pass too.
pub const ALLOWED_COMMANDS: &[&str] = &["npx", "node", "python", "python3", "bun", "deno"];

/// Substrings that disqualify an argument, with the reported reason.
///
/// Ordered so the most specific match is reported: `&&` before `&`.
const UNSAFE_PATTERNS: &[(&str, &str)] = &[
    ("$(", "command substitution"),
    ("`", "command substitution"),
    ("&&", "command chaining"),
    ("||", "command chaining"),
    (";", "shell metacharacter"),
    ("&", "shell metacharacter"),
    ("|", "shell metacharacter"),
    (">", "output redirection"),
    ("<", "input redirection"),
    ("..", "path traversal"),
    ("/etc/", "sensitive system path"),
    ("/proc/", "sensitive system path"),
    ("/sys/", "sensitive system path"),
];

/// Check whether a command's basename is on the allow-list.
///
/// The final path segment (split on both `/` and `\`) is compared
/// case-insensitively, so `npx` and `/opt/homebrew/bin/npx` both pass.
#[must_use]
pub fn is_command_allowed(command: &str) -> bool {
    let basename = command
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(command)
        .to_lowercase();

    !basename.is_empty() && ALLOWED_COMMANDS.contains(&basename.as_str())
}

/// Check a whole argument vector for unsafe patterns.
#[must_use]
pub fn are_args_safe(args: &[String]) -> bool {
    args.iter().all(|arg| unsafe_arg_pattern(arg).is_none())
}

/// Report why an argument is unsafe, if it is.
///
/// Returns the human-readable reason for the first matching pattern so
/// rejection messages can name what was found.
#[must_use]
pub fn unsafe_arg_pattern(arg: &str) -> Option<&'static str> {
    UNSAFE_PATTERNS
        .iter()
        .find(|(needle, _)| arg.contains(needle))
        .map(|&(_, reason)| reason)
}
