//! Filter-query language — tokenizing and evaluation.
//!
//! A query is whitespace-separated tokens.  A token containing a comparison
//! operator with a known metric alias on its left becomes an expression
//! (`stars>=5`, `holds<30%`); everything else is a case-insensitive literal
//! matched as a substring over a set's text fields.  Malformed fragments are
//! never errors — they degrade to literals, because the input is live
//! keystroke-by-keystroke text.

use crate::core::catalog::{Chart, ChartSet};

// ───────────────────────────────────────── tokens ────────────

/// A metric a query expression can compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Stars,
    Bpm,
    /// Chart length in seconds.
    Length,
    Notes,
    Holds,
    Jumps,
    /// Average notes per second.
    Nps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchToken {
    /// Free-text fragment, lowercased.
    Literal(String),
    Expr {
        metric: Metric,
        op: CmpOp,
        value: f64,
        /// `stars>50%`-style comparison; the metric accessor decides how to
        /// normalize (count metrics become a percentage of total notes).
        percent: bool,
    },
}

/// Two-character operators must be tested before their one-character
/// prefixes, or `>=` would split as `>` with a dangling `=`.
const OPERATORS: &[(&str, CmpOp)] = &[
    ("<=", CmpOp::Le),
    (">=", CmpOp::Ge),
    ("!=", CmpOp::Ne),
    ("==", CmpOp::Eq),
    ("<", CmpOp::Lt),
    (">", CmpOp::Gt),
    ("=", CmpOp::Eq),
];

/// Keyword table — several aliases may resolve to the same metric.
const METRIC_ALIASES: &[(&str, Metric)] = &[
    ("stars", Metric::Stars),
    ("difficulty", Metric::Stars),
    ("diff", Metric::Stars),
    ("bpm", Metric::Bpm),
    ("length", Metric::Length),
    ("len", Metric::Length),
    ("duration", Metric::Length),
    ("notes", Metric::Notes),
    ("objects", Metric::Notes),
    ("holds", Metric::Holds),
    ("ln", Metric::Holds),
    ("jumps", Metric::Jumps),
    ("nps", Metric::Nps),
    ("density", Metric::Nps),
];

// ───────────────────────────────────────── tokenizer ─────────

/// Split a raw query into expression and literal tokens.  Literals are
/// trimmed, lowercased and deduplicated; whitespace-only fragments vanish.
pub fn tokenize(raw: &str) -> Vec<SearchToken> {
    let mut out = Vec::new();
    for word in raw.split_whitespace() {
        if let Some(expr) = classify_expression(word) {
            out.push(expr);
            continue;
        }
        let literal = SearchToken::Literal(word.trim().to_lowercase());
        if matches!(&literal, SearchToken::Literal(t) if t.is_empty()) {
            continue;
        }
        if !out.contains(&literal) {
            out.push(literal);
        }
    }
    out
}

/// Try to read `word` as `<alias><op><number[%]>`.  Returns `None` when the
/// word should fall back to a literal: no operator, an empty side, or an
/// unknown keyword.  The first operator found (in table order) wins and the
/// split happens on its first occurrence.
fn classify_expression(word: &str) -> Option<SearchToken> {
    for &(symbol, op) in OPERATORS {
        let Some(pos) = word.find(symbol) else {
            continue;
        };
        let left = &word[..pos];
        let right = &word[pos + symbol.len()..];
        if left.is_empty() || right.is_empty() {
            return None;
        }
        let metric = lookup_metric(left)?;
        let (digits, percent) = match right.strip_suffix('%') {
            Some(rest) => (rest, true),
            None => (right, false),
        };
        // Live input: a half-typed number is value 0, never an error.
        let value = digits.parse::<f64>().unwrap_or(0.0);
        return Some(SearchToken::Expr {
            metric,
            op,
            value,
            percent,
        });
    }
    None
}

fn lookup_metric(alias: &str) -> Option<Metric> {
    let alias = alias.to_lowercase();
    METRIC_ALIASES
        .iter()
        .find(|(name, _)| *name == alias)
        .map(|&(_, metric)| metric)
}

// ───────────────────────────────────────── evaluation ────────

/// How a set aggregates its charts' verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Faithful behavior: the expression pass and the literal pass may be
    /// satisfied by *different* charts of the same set.
    #[default]
    Independent,
    /// Stricter variant: a single chart must satisfy both passes.
    SingleChart,
}

/// Evaluate a token list against a whole set.  Pure; safe to call from the
/// update thread for ad-hoc checks outside the async sweep.
pub fn evaluate(set: &ChartSet, tokens: &[SearchToken], mode: MatchMode) -> bool {
    match mode {
        MatchMode::Independent => expression_pass(set, tokens) && literal_pass(set, tokens),
        MatchMode::SingleChart => set
            .charts
            .iter()
            .any(|chart| chart_matches(set, chart, tokens)),
    }
}

/// One chart's individual verdict: it must satisfy every expression token
/// and contain every literal token.  This is what lands in the chart's
/// match flag (a set-of-one evaluation).
pub fn chart_matches(set: &ChartSet, chart: &Chart, tokens: &[SearchToken]) -> bool {
    tokens.iter().all(|token| match token {
        SearchToken::Expr {
            metric,
            op,
            value,
            percent,
        } => expr_holds(chart, *metric, *op, *value, *percent),
        SearchToken::Literal(text) => chart_text_contains(set, chart, text),
    })
}

/// The set expression-matches when at least one chart satisfies *all*
/// expression tokens.  Zero expression tokens match trivially.
fn expression_pass(set: &ChartSet, tokens: &[SearchToken]) -> bool {
    if !tokens.iter().any(|t| matches!(t, SearchToken::Expr { .. })) {
        return true;
    }
    set.charts.iter().any(|chart| {
        tokens.iter().all(|token| match *token {
            SearchToken::Expr {
                metric,
                op,
                value,
                percent,
            } => expr_holds(chart, metric, op, value, percent),
            SearchToken::Literal(_) => true,
        })
    })
}

/// The set literal-matches when at least one chart's text fields contain
/// *every* literal token.  Zero literal tokens match trivially.
fn literal_pass(set: &ChartSet, tokens: &[SearchToken]) -> bool {
    let literals: Vec<&str> = tokens
        .iter()
        .filter_map(|t| match t {
            SearchToken::Literal(text) => Some(text.as_str()),
            SearchToken::Expr { .. } => None,
        })
        .collect();
    if literals.is_empty() {
        return true;
    }
    set.charts.iter().any(|chart| {
        literals
            .iter()
            .all(|needle| chart_text_contains(set, chart, needle))
    })
}

fn expr_holds(chart: &Chart, metric: Metric, op: CmpOp, value: f64, percent: bool) -> bool {
    let resolved = metric_value(chart, metric, percent);
    // Exact float comparisons are intentional: continuous metrics are
    // rounded to 2 decimals when committed, so `=` is meaningful.
    match op {
        CmpOp::Lt => resolved < value,
        CmpOp::Le => resolved <= value,
        CmpOp::Gt => resolved > value,
        CmpOp::Ge => resolved >= value,
        CmpOp::Eq => resolved == value,
        CmpOp::Ne => resolved != value,
    }
}

/// Resolve a metric on a chart.  An unrated chart's stars are the sentinel
/// `0` and compare as-is.  Count metrics honour percent mode as a share of
/// total notes; the rest ignore the flag.
fn metric_value(chart: &Chart, metric: Metric, percent: bool) -> f64 {
    match metric {
        Metric::Stars => chart.stars,
        Metric::Bpm => chart.bpm,
        Metric::Length => chart.length_secs,
        Metric::Notes => f64::from(chart.notes),
        Metric::Holds => count_metric(chart.holds, chart.notes, percent),
        Metric::Jumps => count_metric(chart.jumps, chart.notes, percent),
        Metric::Nps => chart.nps(),
    }
}

fn count_metric(count: u32, total: u32, percent: bool) -> f64 {
    if !percent {
        return f64::from(count);
    }
    if total == 0 {
        0.0
    } else {
        f64::from(count) / f64::from(total) * 100.0
    }
}

/// Ordered, short-circuiting substring check over a chart's searchable text:
/// set title, artist, chart name, pack, tags, then the numeric ids rendered
/// as decimal strings.  The first field containing the needle wins.
fn chart_text_contains(set: &ChartSet, chart: &Chart, needle: &str) -> bool {
    set.title_lower.contains(needle)
        || set.artist_lower.contains(needle)
        || chart.name_lower.contains(needle)
        || set.pack_lower.contains(needle)
        || set.tags_lower.contains(needle)
        || set.id.to_string().contains(needle)
        || chart.id.to_string().contains(needle)
}

// ───────────────────────────────────────── tests ─────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(id: u64, name: &str) -> Chart {
        Chart::new(id, name, 150.0, 120.0, 600, 60, 90)
    }

    fn one_set(charts: Vec<Chart>) -> ChartSet {
        ChartSet::new(42, "Neon Skyline", "Aki Sound", "Winter Pack 3", "jumpy stream", charts)
    }

    #[test]
    fn test_tokenize_mixed_expressions_and_literals() {
        let tokens = tokenize("stars>=5 bpm<180 foo bar");
        assert_eq!(tokens.len(), 4);
        assert!(tokens.contains(&SearchToken::Expr {
            metric: Metric::Stars,
            op: CmpOp::Ge,
            value: 5.0,
            percent: false,
        }));
        assert!(tokens.contains(&SearchToken::Expr {
            metric: Metric::Bpm,
            op: CmpOp::Lt,
            value: 180.0,
            percent: false,
        }));
        assert!(tokens.contains(&SearchToken::Literal("foo".into())));
        assert!(tokens.contains(&SearchToken::Literal("bar".into())));
    }

    #[test]
    fn test_unknown_keyword_falls_back_to_literal() {
        let tokens = tokenize("a<=b");
        assert_eq!(tokens, vec![SearchToken::Literal("a<=b".into())]);
    }

    #[test]
    fn test_empty_operator_side_falls_back_to_literal() {
        assert_eq!(tokenize("<=5"), vec![SearchToken::Literal("<=5".into())]);
        assert_eq!(
            tokenize("stars<="),
            vec![SearchToken::Literal("stars<=".into())]
        );
    }

    #[test]
    fn test_two_char_operators_win_over_prefixes() {
        match &tokenize("stars>=5")[0] {
            SearchToken::Expr { op, value, .. } => {
                assert_eq!(*op, CmpOp::Ge);
                assert_eq!(*value, 5.0);
            }
            other => panic!("expected expression, got {other:?}"),
        }
        match &tokenize("bpm!=174")[0] {
            SearchToken::Expr { op, .. } => assert_eq!(*op, CmpOp::Ne),
            other => panic!("expected expression, got {other:?}"),
        }
    }

    #[test]
    fn test_metric_aliases_are_case_insensitive() {
        match &tokenize("Diff>3")[0] {
            SearchToken::Expr { metric, .. } => assert_eq!(*metric, Metric::Stars),
            other => panic!("expected expression, got {other:?}"),
        }
    }

    #[test]
    fn test_unparseable_value_defaults_to_zero() {
        match &tokenize("stars>abc")[0] {
            SearchToken::Expr { value, .. } => assert_eq!(*value, 0.0),
            other => panic!("expected expression, got {other:?}"),
        }
    }

    #[test]
    fn test_percent_suffix_sets_percent_flag() {
        match &tokenize("holds>50%")[0] {
            SearchToken::Expr {
                metric,
                value,
                percent,
                ..
            } => {
                assert_eq!(*metric, Metric::Holds);
                assert_eq!(*value, 50.0);
                assert!(*percent);
            }
            other => panic!("expected expression, got {other:?}"),
        }
    }

    #[test]
    fn test_literals_are_lowercased_and_deduplicated() {
        let tokens = tokenize("Foo foo FOO");
        assert_eq!(tokens, vec![SearchToken::Literal("foo".into())]);
    }

    #[test]
    fn test_percent_semantics_and_boundary() {
        // 3 holds of 10 notes = 30%.
        let mut c = chart(1, "x");
        c.notes = 10;
        c.holds = 3;
        let set = one_set(vec![c]);
        assert!(!evaluate(&set, &tokenize("holds>50%"), MatchMode::Independent));
        assert!(evaluate(&set, &tokenize("holds<=50%"), MatchMode::Independent));

        // Exactly 50%: strict `>` must not pass, `>=` must.
        let mut c = chart(2, "y");
        c.notes = 10;
        c.holds = 5;
        let set = one_set(vec![c]);
        assert!(!evaluate(&set, &tokenize("holds>50%"), MatchMode::Independent));
        assert!(evaluate(&set, &tokenize("holds>=50%"), MatchMode::Independent));
    }

    #[test]
    fn test_independent_passes_may_use_different_charts() {
        // Chart A satisfies the expression but not the literal;
        // chart B the literal but not the expression.
        let mut a = chart(1, "quiet");
        a.stars = 6.0;
        let mut b = chart(2, "zebra");
        b.stars = 2.0;
        let set = one_set(vec![a, b]);

        let tokens = tokenize("stars>=5 zebra");
        assert!(evaluate(&set, &tokens, MatchMode::Independent));
        assert!(!evaluate(&set, &tokens, MatchMode::SingleChart));
    }

    #[test]
    fn test_zero_tokens_trivially_match() {
        let set = one_set(vec![chart(1, "x")]);
        assert!(evaluate(&set, &[], MatchMode::Independent));
        assert!(evaluate(&set, &[], MatchMode::SingleChart));
    }

    #[test]
    fn test_unrated_stars_compare_as_sentinel() {
        let set = one_set(vec![chart(1, "x")]);
        assert!(!evaluate(&set, &tokenize("stars>0"), MatchMode::Independent));
        assert!(evaluate(&set, &tokenize("stars<1"), MatchMode::Independent));
    }

    #[test]
    fn test_exact_equality_on_rounded_stars() {
        let mut c = chart(1, "x");
        c.stars = 5.25;
        let set = one_set(vec![c]);
        assert!(evaluate(&set, &tokenize("stars=5.25"), MatchMode::Independent));
        assert!(evaluate(&set, &tokenize("stars==5.25"), MatchMode::Independent));
        assert!(!evaluate(&set, &tokenize("stars!=5.25"), MatchMode::Independent));
    }

    #[test]
    fn test_literal_matches_numeric_ids() {
        let set = one_set(vec![chart(7301, "x")]);
        assert!(evaluate(&set, &tokenize("7301"), MatchMode::Independent));
        assert!(evaluate(&set, &tokenize("42"), MatchMode::Independent));
    }

    #[test]
    fn test_all_literals_must_be_contained() {
        let set = one_set(vec![chart(1, "another")]);
        assert!(evaluate(&set, &tokenize("neon aki"), MatchMode::Independent));
        assert!(!evaluate(&set, &tokenize("neon missing"), MatchMode::Independent));
    }

    #[test]
    fn test_chart_matches_is_a_set_of_one() {
        let mut a = chart(1, "quiet");
        a.stars = 6.0;
        let mut b = chart(2, "zebra");
        b.stars = 2.0;
        let set = one_set(vec![a, b]);
        let tokens = tokenize("stars>=5 zebra");

        assert!(!chart_matches(&set, &set.charts[0], &tokens));
        assert!(!chart_matches(&set, &set.charts[1], &tokens));
    }
}
