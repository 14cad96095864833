//! Recursive-descent parser for the boolean query language.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! OrTerm  -> AndTerm { OR AndTerm }
//! AndTerm -> Leaves { AND Leaves }
//! Leaves  -> ( OrTerm ) | leaf { leaf }
//! ```
//!
//! `and`/`or` are case-insensitive keywords and only act as operators when
//! delimited by whitespace on both sides; anywhere else they are pattern
//! text. A leaf is either a `field:value` parameter (optionally negated with
//! a leading `-`), a `not`-prefixed leaf, or a pattern. Adjacent pattern
//! leaves at one level are an implicit concatenation: literal searches join
//! them into one space-separated pattern, regexp searches keep them as
//! separate conjuncts.

use thiserror::Error;

use crate::fields::Field;
use crate::node::Node;
use crate::node::OperatorKind;
use crate::node::Parameter;
use crate::node::Pattern;
use crate::node::PatternKind;
use crate::node::new_operator;

/// How bare patterns are interpreted when the query does not say.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchType {
    #[default]
    Literal,
    Regexp,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unbalanced expression")]
    UnbalancedExpression,
    #[error("expected operand at {position}")]
    ExpectedOperand { position: usize },
    #[error("unterminated {delimiter}-delimited value")]
    UnterminatedValue { delimiter: char },
    #[error("unexpected NOT before negated filter -{field}:{value}")]
    DoubleNegation { field: Field, value: String },
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Parses `input` into a list of nodes under an implicit top-level AND.
/// An empty or all-whitespace query parses to an empty list.
pub fn parse(input: &str, search_type: SearchType) -> Result<Vec<Node>> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut parser = Parser {
        input,
        pos: 0,
        search_type,
    };
    let nodes = parser.parse_or(0)?;
    parser.skip_spaces();
    if !parser.done() {
        return Err(ParseError::UnbalancedExpression);
    }
    Ok(new_operator(nodes, OperatorKind::And))
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    search_type: SearchType,
}

impl Parser<'_> {
    fn done(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn preceded_by_space(&self) -> bool {
        self.input[..self.pos]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace)
    }

    /// The keyword must also be followed by whitespace; a trailing `and` at
    /// the end of input is pattern text, not an operator.
    fn keyword_body(&self, keyword: &str) -> bool {
        let rest = self.rest();
        let Some(head) = rest.get(..keyword.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(keyword) {
            return false;
        }
        rest[keyword.len()..]
            .chars()
            .next()
            .is_some_and(char::is_whitespace)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.pos > 0 && self.preceded_by_space() && self.keyword_body(keyword)
    }

    fn expect_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += keyword.len();
            return true;
        }
        false
    }

    /// Unary keywords (`not`) may additionally start the input or a
    /// parenthesized group, so `(not a)` round-trips through the
    /// serializer.
    fn expect_unary_keyword(&mut self, keyword: &str) -> bool {
        let at_boundary = self.pos == 0
            || self.input[..self.pos]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_whitespace() || c == '(');
        if at_boundary && self.keyword_body(keyword) {
            self.pos += keyword.len();
            return true;
        }
        false
    }

    fn parse_or(&mut self, depth: usize) -> Result<Vec<Node>> {
        let left = self.parse_and(depth)?;
        self.skip_spaces();
        if !self.expect_keyword("or") {
            return Ok(left);
        }
        let right = self.parse_or(depth)?;
        let mut operands = left;
        operands.extend(right);
        Ok(new_operator(operands, OperatorKind::Or))
    }

    fn parse_and(&mut self, depth: usize) -> Result<Vec<Node>> {
        let left = self.parse_leaves(depth)?;
        if left.is_empty() {
            return Err(ParseError::ExpectedOperand { position: self.pos });
        }
        self.skip_spaces();
        if !self.expect_keyword("and") {
            return Ok(left);
        }
        let right = self.parse_and(depth)?;
        let mut operands = left;
        operands.extend(right);
        Ok(new_operator(operands, OperatorKind::And))
    }

    fn parse_leaves(&mut self, depth: usize) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        loop {
            self.skip_spaces();
            let Some(c) = self.peek() else {
                break;
            };
            if c == '(' {
                self.bump();
                let group = self.parse_or(depth + 1)?;
                self.skip_spaces();
                if self.peek() != Some(')') {
                    return Err(ParseError::UnbalancedExpression);
                }
                self.bump();
                nodes.extend(group);
                continue;
            }
            if c == ')' {
                if depth == 0 {
                    return Err(ParseError::UnbalancedExpression);
                }
                break;
            }
            if self.at_keyword("and") || self.at_keyword("or") {
                break;
            }
            if self.expect_unary_keyword("not") {
                self.skip_spaces();
                nodes.push(self.parse_negated_leaf()?);
                continue;
            }
            nodes.push(self.parse_leaf()?);
        }
        Ok(self.concat_patterns(nodes))
    }

    fn parse_leaf(&mut self) -> Result<Node> {
        if let Some(parameter) = self.try_parse_parameter()? {
            return Ok(parameter);
        }
        self.parse_pattern(false)
    }

    fn parse_negated_leaf(&mut self) -> Result<Node> {
        if let Some(Node::Parameter(p)) = self.try_parse_parameter()? {
            if p.negated {
                return Err(ParseError::DoubleNegation {
                    field: p.field,
                    value: p.value,
                });
            }
            return Ok(Node::Parameter(Parameter {
                negated: true,
                ..p
            }));
        }
        self.parse_pattern(true)
    }

    /// Attempts to parse `field:value` or `-field:value`. Returns `None`
    /// without consuming anything when the prefix is not a recognized field;
    /// the caller then treats the token as pattern text.
    fn try_parse_parameter(&mut self) -> Result<Option<Node>> {
        let negated = self.peek() == Some('-');
        let name_start = if negated { self.pos + 1 } else { self.pos };
        let rest = &self.input[name_start..];
        let name_len = rest
            .chars()
            .take_while(char::is_ascii_alphabetic)
            .count();
        if name_len == 0 || !rest[name_len..].starts_with(':') {
            return Ok(None);
        }
        let Some(field) = Field::parse(&rest[..name_len]) else {
            return Ok(None);
        };
        self.pos = name_start + name_len + 1;
        let value = self.parse_field_value()?;
        Ok(Some(Node::Parameter(Parameter {
            field,
            value,
            negated,
        })))
    }

    /// A field value is either quoted or runs to the next whitespace.
    /// Unterminated quotes are an error here (unlike in patterns, where a
    /// stray quote is plausible search text).
    fn parse_field_value(&mut self) -> Result<String> {
        match self.peek() {
            Some(delimiter @ ('"' | '\'')) => self.scan_delimited(delimiter),
            _ => Ok(self.scan_balanced_value()),
        }
    }

    fn parse_pattern(&mut self, negated: bool) -> Result<Node> {
        let start = self.pos;
        match self.peek() {
            Some(delimiter @ ('"' | '\'')) => {
                if let Ok(value) = self.scan_delimited(delimiter) {
                    return Ok(Node::Pattern(Pattern {
                        value,
                        negated,
                        kind: PatternKind::Literal,
                    }));
                }
                self.pos = start;
            }
            Some('/') => {
                if let Ok(value) = self.scan_delimited('/') {
                    if !value.is_empty() {
                        return Ok(Node::Pattern(Pattern {
                            value,
                            negated,
                            kind: PatternKind::Regexp,
                        }));
                    }
                }
                self.pos = start;
            }
            _ => {}
        }
        let value = self.scan_balanced_value();
        let kind = match self.search_type {
            SearchType::Literal => PatternKind::Literal,
            SearchType::Regexp => PatternKind::Regexp,
        };
        Ok(Node::Pattern(Pattern {
            value,
            negated,
            kind,
        }))
    }

    /// Scans a bare value up to the next whitespace. Balanced parens are
    /// part of the value (`repo:(foo|bar)`, `f(x)`); an unmatched `)` is
    /// left in place for the enclosing group. If the value leaves a paren
    /// open, the scan backs off to the first paren instead.
    fn scan_balanced_value(&mut self) -> String {
        let start = self.pos;
        let mut depth = 0usize;
        loop {
            let Some(c) = self.peek() else {
                break;
            };
            if c.is_whitespace() {
                break;
            }
            match c {
                '(' => depth += 1,
                ')' => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                '\\' => {
                    self.bump();
                    if self.peek().is_none() {
                        break;
                    }
                }
                _ => {}
            }
            self.bump();
        }
        if depth > 0 {
            self.pos = start;
            return self.scan_plain_value();
        }
        self.input[start..self.pos].to_string()
    }

    fn scan_plain_value(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '(' || c == ')' {
                break;
            }
            if c == '\\' {
                self.bump();
                if self.peek().is_none() {
                    break;
                }
            }
            self.bump();
        }
        self.input[start..self.pos].to_string()
    }

    /// Scans a `delimiter`-quoted value, interpreting `\delimiter`, `\\` and
    /// the common whitespace escapes. Other escape sequences pass through
    /// verbatim.
    fn scan_delimited(&mut self, delimiter: char) -> Result<String> {
        self.bump();
        let mut value = String::new();
        while let Some(c) = self.peek() {
            self.bump();
            if c == delimiter {
                return Ok(value);
            }
            if c != '\\' {
                value.push(c);
                continue;
            }
            let Some(escaped) = self.peek() else {
                break;
            };
            self.bump();
            match escaped {
                'n' => value.push('\n'),
                'r' => value.push('\r'),
                't' => value.push('\t'),
                c if c == delimiter || c == '\\' => value.push(c),
                other => {
                    value.push('\\');
                    value.push(other);
                }
            }
        }
        Err(ParseError::UnterminatedValue { delimiter })
    }

    /// Merges adjacent non-negated literal pattern leaves into one
    /// space-joined pattern. Regexp searches keep them separate; the
    /// implicit AND between them is taken literally.
    fn concat_patterns(&self, nodes: Vec<Node>) -> Vec<Node> {
        if self.search_type != SearchType::Literal {
            return nodes;
        }
        let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Pattern(p) if !p.negated && p.kind == PatternKind::Literal => {
                    match out.last_mut() {
                        Some(Node::Pattern(prev))
                            if !prev.negated && prev.kind == PatternKind::Literal =>
                        {
                            prev.value.push(' ');
                            prev.value.push_str(&p.value);
                        }
                        _ => out.push(Node::Pattern(p)),
                    }
                }
                other => out.push(other),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::node::to_query_string;
    use crate::node::to_sexpr;

    fn parse_sexpr(input: &str, search_type: SearchType) -> String {
        let nodes = parse(input, search_type).expect("query should parse");
        to_sexpr(&nodes)
    }

    #[test]
    fn empty_query_parses_to_nothing() {
        assert_eq!(parse("", SearchType::Literal), Ok(Vec::new()));
        assert_eq!(parse("   ", SearchType::Literal), Ok(Vec::new()));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(
            parse_sexpr("a and b or c", SearchType::Regexp),
            r#"(or (and "a" "b") "c")"#
        );
        assert_eq!(
            parse_sexpr("a or b and c", SearchType::Regexp),
            r#"(or "a" (and "b" "c"))"#
        );
    }

    #[test]
    fn parens_group() {
        assert_eq!(
            parse_sexpr("a and (b or c)", SearchType::Regexp),
            r#"(and "a" (or "b" "c"))"#
        );
    }

    #[test]
    fn same_kind_operators_flatten() {
        assert_eq!(
            parse_sexpr("a and (b and c)", SearchType::Regexp),
            r#"(and "a" "b" "c")"#
        );
        assert_eq!(
            parse_sexpr("a or b or c", SearchType::Regexp),
            r#"(or "a" "b" "c")"#
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            parse_sexpr("a OR b And c", SearchType::Regexp),
            r#"(or "a" (and "b" "c"))"#
        );
    }

    #[test]
    fn parameters_and_negation() {
        assert_eq!(
            parse_sexpr(r"repo:foo -file:\.go$ b", SearchType::Literal),
            r#"(and "repo:foo" "-file:\.go$" "b")"#
        );
    }

    #[test]
    fn field_aliases_resolve() {
        assert_eq!(
            parse_sexpr("r:foo l:rust x", SearchType::Literal),
            r#"(and "repo:foo" "lang:rust" "x")"#
        );
    }

    #[test]
    fn unknown_field_prefix_is_pattern_text() {
        assert_eq!(parse_sexpr("foo:bar", SearchType::Literal), r#""foo:bar""#);
    }

    #[test]
    fn not_negates_patterns_and_parameters() {
        assert_eq!(
            parse_sexpr("a not b", SearchType::Literal),
            r#"(and "a" (not "b"))"#
        );
        assert_eq!(
            parse_sexpr("not repo:foo x", SearchType::Literal),
            r#"(and "-repo:foo" "x")"#
        );
    }

    #[test]
    fn not_is_recognized_at_a_group_start() {
        assert_eq!(
            parse_sexpr("(not a) or b", SearchType::Literal),
            r#"(or (not "a") "b")"#
        );
        assert_eq!(
            parse_sexpr("x and (not y)", SearchType::Regexp),
            r#"(and "x" (not "y"))"#
        );
    }

    #[test]
    fn not_before_negated_parameter_is_an_error() {
        assert_eq!(
            parse("not -repo:foo", SearchType::Literal),
            Err(ParseError::DoubleNegation {
                field: Field::Repo,
                value: "foo".to_string(),
            })
        );
    }

    #[test]
    fn adjacent_literal_patterns_concatenate() {
        assert_eq!(
            parse_sexpr("foo bar baz", SearchType::Literal),
            r#""foo bar baz""#
        );
    }

    #[test]
    fn adjacent_regexp_patterns_stay_separate() {
        assert_eq!(
            parse_sexpr("foo bar", SearchType::Regexp),
            r#"(and "foo" "bar")"#
        );
    }

    #[test]
    fn quoted_values() {
        assert_eq!(
            parse_sexpr(r#"content:"a b" 'c d'"#, SearchType::Literal),
            r#"(and "content:a b" "c d")"#
        );
    }

    #[test]
    fn slash_delimits_a_regexp_pattern() {
        let nodes = parse("/fo+/", SearchType::Literal).expect("query should parse");
        assert_eq!(
            nodes,
            vec![Node::pattern("fo+", PatternKind::Regexp)]
        );
    }

    #[test]
    fn balanced_parens_stay_in_values() {
        assert_eq!(
            parse_sexpr("repo:(foo|bar) x", SearchType::Literal),
            r#"(and "repo:(foo|bar)" "x")"#
        );
    }

    #[test]
    fn closing_paren_of_a_group_is_not_value_text() {
        assert_eq!(
            parse_sexpr("(a b repo:foo)", SearchType::Literal),
            r#"(and "a b" "repo:foo")"#
        );
    }

    #[test]
    fn unbalanced_parens_are_an_error() {
        assert_eq!(
            parse("(a or b", SearchType::Literal),
            Err(ParseError::UnbalancedExpression)
        );
        assert_eq!(
            parse("a)", SearchType::Literal),
            Err(ParseError::UnbalancedExpression)
        );
    }

    #[test]
    fn missing_operand_is_an_error() {
        assert_eq!(
            parse("a and and b", SearchType::Literal),
            Err(ParseError::ExpectedOperand { position: 6 })
        );
        // a leading `or` inside a group is pattern text, not an operator
        assert_eq!(
            parse_sexpr("a or (or b)", SearchType::Literal),
            r#"(or "a" "or b")"#
        );
    }

    #[test]
    fn unterminated_field_quote_is_an_error() {
        assert_eq!(
            parse(r#"repo:"unterminated"#, SearchType::Literal),
            Err(ParseError::UnterminatedValue { delimiter: '"' })
        );
    }

    #[test]
    fn keyword_without_both_delimiters_is_pattern_text() {
        assert_eq!(parse_sexpr("and", SearchType::Literal), r#""and""#);
        assert_eq!(
            parse_sexpr("a or", SearchType::Literal),
            r#""a or""#
        );
    }

    #[test]
    fn reserialized_queries_reparse_to_the_same_structure() {
        for (query, search_type) in [
            ("a and b or c", SearchType::Regexp),
            ("repo:foo (b or c) -file:test", SearchType::Regexp),
            ("x and (y or z) and w", SearchType::Regexp),
            ("not a or b", SearchType::Regexp),
            ("(not a) and b", SearchType::Regexp),
        ] {
            let first = parse(query, search_type).expect("query should parse");
            let reparsed =
                parse(&to_query_string(&first), search_type).expect("round trip should parse");
            assert_eq!(to_sexpr(&first), to_sexpr(&reparsed), "query: {query}");
        }
    }
}
