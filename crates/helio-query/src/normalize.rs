//! Query normalization.
//!
//! Detects whether a raw phrase uses advanced index syntax, repairs
//! malformed user input before compilation, and optionally forces boolean
//! and range keywords to their canonical uppercase forms.

use std::sync::LazyLock;

use regex::Regex;

/// The "match all documents" sentinel query.
pub const MATCH_ALL: &str = "*:*";

/// Quoted substrings (used to exclude them from syntax detection).
static QUOTED: LazyLock<Regex> = LazyLock::new(|| compile(r#""[^"]*""#));

/// Field qualifier: a colon with non-whitespace on both sides.
static FIELD_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| compile(r"\S:\S"));

/// Boost marker: a caret followed by digits.
static BOOST: LazyLock<Regex> = LazyLock::new(|| compile(r"\^[0-9]+"));

/// Case-sensitive range expression.
static RANGE: LazyLock<Regex> = LazyLock::new(|| compile(RANGE_PATTERN));

/// Case-insensitive range expression.
static RANGE_CI: LazyLock<Regex> = LazyLock::new(|| compile_ci(RANGE_PATTERN));

/// Case-sensitive boolean keyword surrounded by whitespace (or leading NOT).
static BOOLEAN: LazyLock<Regex> = LazyLock::new(|| compile(BOOLEAN_PATTERN));

/// Case-insensitive variant of [`BOOLEAN`].
static BOOLEAN_CI: LazyLock<Regex> = LazyLock::new(|| compile_ci(BOOLEAN_PATTERN));

/// Well-formed bracket range (no internal brackets or whitespace in the
/// endpoints), used by the sanitizer's escape pass.
static BRACKET_RANGE: LazyLock<Regex> = LazyLock::new(|| compile(BRACKET_RANGE_PATTERN));

/// Case-insensitive variant of [`BRACKET_RANGE`].
static BRACKET_RANGE_CI: LazyLock<Regex> = LazyLock::new(|| compile_ci(BRACKET_RANGE_PATTERN));

/// Well-formed brace range, used by the sanitizer's escape pass.
static BRACE_RANGE: LazyLock<Regex> = LazyLock::new(|| compile(BRACE_RANGE_PATTERN));

/// Case-insensitive variant of [`BRACE_RANGE`].
static BRACE_RANGE_CI: LazyLock<Regex> = LazyLock::new(|| compile_ci(BRACE_RANGE_PATTERN));

/// Boolean keyword replacement target inside an unquoted segment.
static BOOLEAN_WORD: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\b(and|or|not)\b"));

/// Full range expression with captured delimiters and endpoints, for
/// case canonicalization.
static RANGE_PARTS: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)([\[{])([^\]}]+)\s+TO\s+([^\]}]+)([\]}])"));

/// ISO-8601 timestamp, exempt from range case expansion.
static TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)[0-9]{4}-[0-9]{2}-[0-9]{2}t[0-9]{2}:[0-9]{2}:[0-9]{2}z"));

/// Pattern sources shared between the sensitive and insensitive variants.
const RANGE_PATTERN: &str = r"(\[.+\s+TO\s+.+\])|(\{.+\s+TO\s+.+\})";

/// Boolean keyword surrounded by whitespace, or NOT leading the query.
const BOOLEAN_PATTERN: &str = r"(\s+(AND|OR|NOT)\s+)|^NOT\s+";

/// Well-formed `[x TO y]` with simple endpoints.
const BRACKET_RANGE_PATTERN: &str = r"\[([^\[\]\s]+\s+TO\s+[^\[\]\s]+)\]";

/// Well-formed `{x TO y}` with simple endpoints.
const BRACE_RANGE_PATTERN: &str = r"\{([^\{\}\s]+\s+TO\s+[^\{\}\s]+)\}";

/// Compiles a pattern literal.
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern is valid")
}

/// Compiles a pattern literal with case-insensitive matching.
fn compile_ci(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("static pattern is valid")
}

/// Query normalization rules.
///
/// The two flags mirror backend configuration: when booleans or ranges are
/// case-sensitive, only the uppercase forms are recognized as operators;
/// otherwise lowercase forms are recognized too, and
/// [`Normalizer::canonicalize_case`] rewrites them to uppercase before the
/// query is submitted.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    /// Whether boolean keywords must be uppercase to act as operators.
    case_sensitive_booleans: bool,
    /// Whether range keywords must be uppercase to act as operators.
    case_sensitive_ranges: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl Normalizer {
    /// Creates a normalizer with the given case-sensitivity flags.
    pub fn new(case_sensitive_booleans: bool, case_sensitive_ranges: bool) -> Self {
        Self {
            case_sensitive_booleans,
            case_sensitive_ranges,
        }
    }

    /// True if boolean keywords must be uppercase to act as operators.
    pub fn case_sensitive_booleans(&self) -> bool {
        self.case_sensitive_booleans
    }

    /// True if range keywords must be uppercase to act as operators.
    pub fn case_sensitive_ranges(&self) -> bool {
        self.case_sensitive_ranges
    }

    /// Does the phrase use advanced index syntax?
    ///
    /// Advanced phrases bypass tokenized munging and are compiled through
    /// the advanced adapter instead.
    pub fn is_advanced(&self, query: &str) -> bool {
        if query == MATCH_ALL {
            return true;
        }

        // None of the following checks apply to text inside quoted
        // strings, so replace quoted phrases with a dummy keyword. The
        // dummy (rather than plain removal) keeps the field-qualifier
        // check from seeing characters pushed together across a removed
        // phrase.
        let query = QUOTED.replace_all(query, "quoted");

        if FIELD_QUALIFIER.is_match(&query) {
            return true;
        }
        if query.contains('(') && query.contains(')') {
            return true;
        }
        let range = if self.case_sensitive_ranges {
            &RANGE
        } else {
            &RANGE_CI
        };
        if range.is_match(&query) {
            return true;
        }
        let boolean = if self.case_sensitive_booleans {
            &BOOLEAN
        } else {
            &BOOLEAN_CI
        };
        if boolean.is_match(&query) {
            return true;
        }
        if query.contains('*') || query.contains('?') || query.contains('~') {
            return true;
        }
        BOOST.is_match(&query)
    }

    /// Repairs malformed user input best-effort.
    ///
    /// Typos that would be backend syntax errors (unbalanced parentheses,
    /// stray carets, loose brackets) are stripped rather than rejected, so
    /// they never reach the backend. The result is stable under repeated
    /// application.
    pub fn validate_input(&self, input: &str) -> String {
        let mut input = normalize_fancy_quotes(input);

        // A lone boolean operator would be a syntax error; lowercase it so
        // it is treated as an ordinary search term.
        match input.trim() {
            "OR" => return "or".to_string(),
            "AND" => return "and".to_string(),
            "NOT" => return "not".to_string(),
            _ => {}
        }

        // Input consisting only of operators and quote characters is
        // meaningless; wipe it out entirely.
        let mut residue = input.clone();
        for operator in ["AND", "OR", "NOT", "+", "-", "\"", "&", "|"] {
            residue = residue.replace(operator, "");
        }
        if residue.trim().is_empty() {
            return String::new();
        }

        // The match-all sentinel is expressed as a blank basic search.
        if input.trim() == MATCH_ALL {
            return String::new();
        }

        // Wildcards may not lead the input.
        if input.starts_with('*') || input.starts_with('?') {
            input.remove(0);
        }

        // Unbalanced parentheses: strip all of them.
        let open = input.matches('(').count();
        let close = input.matches(')').count();
        if open != close {
            input.retain(|c| c != '(' && c != ')');
        }

        // Carets are only legal as `^digit` boosts with something in front
        // of them; if any caret violates that, strip all carets.
        if !carets_are_boosts(&input) {
            input.retain(|c| c != '^');
        }

        self.strip_loose_brackets(&input)
    }

    /// Removes brackets and braces that are not part of a well-formed
    /// range expression.
    ///
    /// This is a two-pass shell game: well-formed range delimiters are
    /// first replaced with sentinel tokens that cannot occur in the input
    /// (the caret normalization above makes a `^^` sequence impossible),
    /// every remaining bracket character is deleted, and the sentinels are
    /// then restored to real delimiters. A phrase that happened to contain
    /// the literal sentinel text would be mishandled.
    fn strip_loose_brackets(&self, input: &str) -> String {
        let (bracket, brace) = if self.case_sensitive_ranges {
            (&BRACKET_RANGE, &BRACE_RANGE)
        } else {
            (&BRACKET_RANGE_CI, &BRACE_RANGE_CI)
        };

        let escaped = bracket.replace_all(input, "^^lbrack^^${1}^^rbrack^^");
        let escaped = brace.replace_all(&escaped, "^^lbrace^^${1}^^rbrace^^");

        let mut stripped: String = escaped
            .chars()
            .filter(|c| !matches!(c, '[' | ']' | '{' | '}'))
            .collect();

        for (token, delimiter) in [
            ("^^lbrack^^", "["),
            ("^^rbrack^^", "]"),
            ("^^lbrace^^", "{"),
            ("^^rbrace^^", "}"),
        ] {
            stripped = stripped.replace(token, delimiter);
        }
        stripped
    }

    /// Rewrites boolean and range keywords to uppercase where the
    /// configuration recognizes their lowercase forms.
    ///
    /// A no-op in fully case-sensitive mode.
    pub fn canonicalize_case(&self, query: &str) -> String {
        let mut query = query.to_string();
        if !self.case_sensitive_booleans {
            query = capitalize_booleans(&query);
        }
        if !self.case_sensitive_ranges {
            query = capitalize_ranges(&query);
        }
        query
    }
}

/// Maps curly and angled quote variants onto straight ASCII quotes.
fn normalize_fancy_quotes(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\u{00AB}' | '\u{00BB}' | '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2039}' | '\u{203A}' => '\'',
            other => other,
        })
        .collect()
}

/// True if every caret in the input is a boost: preceded by at least one
/// character and immediately followed by a digit.
fn carets_are_boosts(input: &str) -> bool {
    let bytes = input.as_bytes();
    for (i, &byte) in bytes.iter().enumerate() {
        if byte != b'^' {
            continue;
        }
        if i == 0 || !bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
            return false;
        }
    }
    true
}

/// Uppercases boolean keywords outside quoted strings.
///
/// Recognized positions match the advanced-syntax detector: the keyword
/// must stand alone as a word. Quoted phrases are left untouched.
pub fn capitalize_booleans(query: &str) -> String {
    map_unquoted_segments(query, |segment| {
        BOOLEAN_WORD
            .replace_all(segment, |caps: &regex::Captures<'_>| caps[1].to_uppercase())
            .into_owned()
    })
}

/// Canonicalizes range expressions outside quoted strings.
///
/// The `TO` keyword and the endpoints are uppercased. Alphabetic endpoints
/// are additionally expanded to check both cases against the edges of the
/// range, i.e. `[a to b]` becomes `([a TO b] OR [A TO B])`. Ranges over
/// ISO timestamps are only uppercased, never expanded, since a lowercase
/// variant would be an illegal timestamp.
pub fn capitalize_ranges(query: &str) -> String {
    map_unquoted_segments(query, |segment| {
        RANGE_PARTS
            .replace_all(segment, |caps: &regex::Captures<'_>| {
                canonicalize_range(&caps[1], &caps[2], &caps[3], &caps[4])
            })
            .into_owned()
    })
}

/// Builds the canonical form of one range expression.
fn canonicalize_range(open: &str, start: &str, end: &str, close: &str) -> String {
    let start = start.trim();
    let end = end.trim();
    let has_letters = |s: &str| s.chars().any(char::is_alphabetic);

    let upper = format!(
        "{open}{} TO {}{close}",
        start.to_uppercase(),
        end.to_uppercase()
    );

    if !has_letters(start) && !has_letters(end) {
        return upper;
    }
    if TIMESTAMP.is_match(start) || TIMESTAMP.is_match(end) {
        return upper;
    }

    let lower = format!(
        "{open}{} TO {}{close}",
        start.to_lowercase(),
        end.to_lowercase()
    );
    format!("({lower} OR {upper})")
}

/// Applies `transform` to the unquoted portions of the query, leaving
/// quoted phrases byte-for-byte intact.
fn map_unquoted_segments(query: &str, transform: impl Fn(&str) -> String) -> String {
    let mut result = String::with_capacity(query.len());
    let mut last = 0;
    for quoted in QUOTED.find_iter(query) {
        result.push_str(&transform(&query[last..quoted.start()]));
        result.push_str(quoted.as_str());
        last = quoted.end();
    }
    result.push_str(&transform(&query[last..]));
    result
}
