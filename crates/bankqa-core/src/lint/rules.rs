//! The individual lint rules.
//!
//! Each rule inspects one item and returns its delta. Rules never look at
//! one another's output.

use std::collections::{BTreeMap, BTreeSet};

use super::{LintContext, RuleOutcome, Severity};
use crate::model::{Item, ItemType, KeyStatus};
use crate::text::{lexical_overlap, token_normalize, words};

const STRUCTURAL_PENALTY: i32 = -60;

/// Missing stem, invalid choices, invalid answer key.
pub fn structure(item: &Item, _ctx: &LintContext<'_>) -> RuleOutcome {
    let mut out = RuleOutcome::none();
    if item.stem.is_blank() {
        out = out.merge(RuleOutcome::flag(
            STRUCTURAL_PENALTY,
            Severity::Error,
            "missing_stem",
            "Missing stem.",
        ));
    }
    if !item.has_valid_choices() {
        // An answer key cannot be judged against unusable choices.
        return out.merge(RuleOutcome::flag(
            STRUCTURAL_PENALTY,
            Severity::Error,
            "invalid_choices",
            "Choices must be a list with at least two entries.",
        ));
    }
    let (kind, message) = match (item.key_status(), item.item_type()) {
        (KeyStatus::Valid(_), _) => return out,
        (KeyStatus::Missing, ItemType::SingleAnswer) => {
            ("invalid_correct_index", "Missing correctIndex.".to_string())
        }
        (KeyStatus::Missing, t) => ("missing_answer_key", format!("{t} item has no answer key.")),
        (KeyStatus::Invalid(reason), ItemType::SingleAnswer) => ("invalid_correct_index", reason),
        (KeyStatus::Invalid(reason), ItemType::MultiSelect) => ("invalid_correct_answers", reason),
        (KeyStatus::Invalid(reason), ItemType::Ordering) => ("invalid_correct_order", reason),
    };
    out.merge(RuleOutcome::flag(
        STRUCTURAL_PENALTY,
        Severity::Error,
        kind,
        message,
    ))
}

pub fn stem_length(item: &Item, ctx: &LintContext<'_>) -> RuleOutcome {
    let count = words(item.stem.text()).len();
    if count < ctx.config.min_stem_words {
        RuleOutcome::flag(
            -8,
            Severity::Graded,
            "stem_too_short",
            format!("Stem is short ({count} words); may be recall-only."),
        )
    } else if count > ctx.config.max_stem_words {
        RuleOutcome::flag(
            -5,
            Severity::Graded,
            "stem_too_long",
            format!("Stem is long ({count} words); reading load may add noise."),
        )
    } else {
        RuleOutcome::none()
    }
}

pub fn negative_stem(item: &Item, ctx: &LintContext<'_>) -> RuleOutcome {
    let stem = item.stem.text();
    if ctx.tables.negative_patterns.iter().any(|re| re.is_match(stem)) {
        RuleOutcome::flag(
            -7,
            Severity::Warning,
            "negative_stem",
            "Negative stem wording (NOT/EXCEPT/LEAST/FALSE) adds construct-irrelevant difficulty.",
        )
    } else {
        RuleOutcome::none()
    }
}

pub fn absolute_wording(item: &Item, ctx: &LintContext<'_>) -> RuleOutcome {
    let hits: BTreeSet<String> = words(item.stem.text())
        .into_iter()
        .filter(|w| ctx.tables.absolute_terms.contains(w.as_str()))
        .collect();
    if hits.is_empty() {
        return RuleOutcome::none();
    }
    let list = hits.into_iter().collect::<Vec<_>>().join(", ");
    RuleOutcome::flag(
        -4,
        Severity::Graded,
        "absolute_wording",
        format!("Absolute wording in stem: {list}."),
    )
}

pub fn duplicate_choices(item: &Item, _ctx: &LintContext<'_>) -> RuleOutcome {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for choice in item.choices() {
        let normalized = token_normalize(choice);
        if !normalized.is_empty() {
            *counts.entry(normalized).or_insert(0) += 1;
        }
    }
    if counts.values().any(|&n| n > 1) {
        RuleOutcome::flag(
            -35,
            Severity::Error,
            "duplicate_choices",
            "Duplicate or near-duplicate choices detected.",
        )
    } else {
        RuleOutcome::none()
    }
}

pub fn testwise_cue(item: &Item, ctx: &LintContext<'_>) -> RuleOutcome {
    let cued = item
        .choices()
        .iter()
        .any(|c| ctx.tables.cue_patterns.iter().any(|re| re.is_match(c)));
    if cued {
        RuleOutcome::flag(
            -8,
            Severity::Warning,
            "testwise_cue",
            "Choice uses a test-wise cue phrase (all/none of the above, both A and B).",
        )
    } else {
        RuleOutcome::none()
    }
}

fn choice_lengths(item: &Item) -> Vec<usize> {
    item.choices()
        .iter()
        .map(|c| c.trim().chars().count())
        .collect()
}

pub fn choice_length_outlier(item: &Item, ctx: &LintContext<'_>) -> RuleOutcome {
    let lengths = choice_lengths(item);
    let Some(&longest) = lengths.iter().max() else {
        return RuleOutcome::none();
    };
    let mean = lengths.iter().sum::<usize>() as f64 / lengths.len() as f64;
    if mean > 0.0 && longest as f64 > mean * ctx.config.length_ratio {
        RuleOutcome::flag(
            -7,
            Severity::Warning,
            "choice_length_outlier",
            format!(
                "Longest choice is {longest} characters against a mean of {mean:.1}; may cue the answer."
            ),
        )
    } else {
        RuleOutcome::none()
    }
}

pub fn very_short_distractor(item: &Item, ctx: &LintContext<'_>) -> RuleOutcome {
    match choice_lengths(item).into_iter().min() {
        Some(shortest) if shortest > 0 && shortest < ctx.config.short_choice_chars => {
            RuleOutcome::flag(
                -4,
                Severity::Graded,
                "very_short_distractor",
                format!("Shortest choice has only {shortest} characters."),
            )
        }
        _ => RuleOutcome::none(),
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn keyword_cueing(item: &Item, ctx: &LintContext<'_>) -> RuleOutcome {
    let Some(keyed) = item.keyed_choices() else {
        return RuleOutcome::none();
    };
    let stem = item.stem.text();
    let (correct, distractors): (Vec<(usize, &String)>, Vec<(usize, &String)>) = item
        .choices()
        .iter()
        .enumerate()
        .partition(|(i, _)| keyed.contains(i));
    if correct.is_empty() || distractors.is_empty() {
        return RuleOutcome::none();
    }
    let overlap = |set: &[(usize, &String)]| {
        mean(
            &set.iter()
                .map(|(_, c)| lexical_overlap(stem, c))
                .collect::<Vec<_>>(),
        )
    };
    let keyed_overlap = overlap(correct.as_slice());
    let distractor_overlap = overlap(distractors.as_slice());
    if keyed_overlap - distractor_overlap > ctx.config.overlap_delta {
        RuleOutcome::flag(
            -6,
            Severity::Graded,
            "keyword_cueing",
            format!(
                "Keyed choice echoes stem vocabulary ({keyed_overlap:.2} vs {distractor_overlap:.2} for distractors)."
            ),
        )
    } else {
        RuleOutcome::none()
    }
}

pub fn thin_explanation(item: &Item, ctx: &LintContext<'_>) -> RuleOutcome {
    let count = words(item.explanation.text()).len();
    if count < ctx.config.min_explanation_words {
        RuleOutcome::flag(
            -7,
            Severity::Warning,
            "thin_explanation",
            format!("Explanation is thin ({count} words)."),
        )
    } else {
        RuleOutcome::none()
    }
}

pub fn judgment_metadata(item: &Item, ctx: &LintContext<'_>) -> RuleOutcome {
    if !item.question_type().eq_ignore_ascii_case("judgment") {
        return RuleOutcome::none();
    }
    match item.judgment_level.value() {
        Some(&level) if level >= ctx.config.min_judgment_level => RuleOutcome::none(),
        Some(&level) => RuleOutcome::flag(
            -5,
            Severity::Warning,
            "judgment_level_low",
            format!(
                "Judgment item has judgmentLevel {level}, below {}.",
                ctx.config.min_judgment_level
            ),
        ),
        None => RuleOutcome::flag(
            -5,
            Severity::Warning,
            "judgment_level_low",
            "Judgment item is missing judgmentLevel.",
        ),
    }
}

/// Small bonuses for scenario framing, plus nudges when it is absent.
pub fn scenario_richness(item: &Item, ctx: &LintContext<'_>) -> RuleOutcome {
    let stem_words: BTreeSet<String> = words(item.stem.text()).into_iter().collect();
    let hits = |vocab: &BTreeSet<&'static str>| {
        stem_words
            .iter()
            .filter(|w| vocab.contains(w.as_str()))
            .count()
    };
    let context = hits(&ctx.tables.context_words);
    let decision = hits(&ctx.tables.decision_words);
    let role = hits(&ctx.tables.role_words);

    let mut out = RuleOutcome::none();
    if context >= 3 {
        out.delta += 2;
    }
    if decision >= 1 {
        out.delta += 2;
    }
    if role >= 1 {
        out.delta += 1;
    }
    if role == 0 {
        out = out.merge(RuleOutcome::flag(
            0,
            Severity::Suggestion,
            "missing_actor_context",
            "No actor or role in the stem; consider a scenario framing.",
        ));
    }
    if decision == 0 {
        out = out.merge(RuleOutcome::flag(
            0,
            Severity::Suggestion,
            "missing_decision_prompt",
            "No decision prompt (best, first, most, should); item may test recall only.",
        ));
    }
    out
}

pub fn duplicate_stem(item: &Item, ctx: &LintContext<'_>) -> RuleOutcome {
    let stem = token_normalize(item.stem.text());
    let count = ctx.stem_count(&stem);
    if !stem.is_empty() && count > 1 {
        RuleOutcome::flag(
            -10,
            Severity::Warning,
            "duplicate_stem",
            format!("Stem is shared by {count} items."),
        )
    } else {
        RuleOutcome::none()
    }
}

pub fn orphan_variant(item: &Item, ctx: &LintContext<'_>) -> RuleOutcome {
    let parent = item.variant_of.text().trim();
    if parent.is_empty() {
        if item.is_synthetic_variant.value() == Some(&true) {
            return RuleOutcome::flag(
                -3,
                Severity::Warning,
                "orphan_variant",
                "Synthetic variant has no variantOf parent.",
            );
        }
        return RuleOutcome::none();
    }
    if ctx.has_item(parent) {
        return RuleOutcome::none();
    }
    RuleOutcome::flag(
        -3,
        Severity::Warning,
        "orphan_variant",
        format!("variantOf names '{parent}', which is not in the bank."),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LintConfig;
    use crate::lint::{lint_item, LintTables, Rule};
    use crate::model::Bank;
    use crate::parser::parse_bank;

    const SCENARIO: &str = "An organization's CISO must decide which security control \
        the incident response team should implement first after a vendor breach.";
    const EXPLANATION: &str = "Containment limits the blast radius of the breach while \
        evidence is preserved, which comes before eradication or recovery in every \
        mainstream incident handling lifecycle including the NIST model.";

    fn bank_of(items: &str) -> Bank {
        parse_bank(format!(r#"{{"items": [{items}]}}"#).as_bytes()).unwrap()
    }

    fn run(rule: Rule, bank: &Bank) -> RuleOutcome {
        let tables = LintTables::new().unwrap();
        let config = LintConfig::default();
        let ctx = LintContext::new(bank, &tables, &config);
        rule(&bank.items[0], &ctx)
    }

    fn score(bank: &Bank) -> u32 {
        let tables = LintTables::new().unwrap();
        let config = LintConfig::default();
        let ctx = LintContext::new(bank, &tables, &config);
        lint_item(&bank.items[0], &ctx).score.quality_score
    }

    fn item_json(stem: &str, choices: &str, key: usize) -> String {
        format!(
            r#"{{"id": "q", "stem": "{stem}", "choices": {choices},
                "correctIndex": {key}, "explanation": "{EXPLANATION}"}}"#
        )
    }

    fn kinds(outcome: &RuleOutcome) -> Vec<&'static str> {
        outcome.findings.iter().map(|f| f.kind).collect()
    }

    #[test]
    fn duplicate_choice_costs_exactly_35() {
        let baseline = bank_of(&item_json(SCENARIO, r#"["A", "D", "B", "C"]"#, 2));
        let duplicated = bank_of(&item_json(SCENARIO, r#"["A", "A", "B", "C"]"#, 2));

        let outcome = run(duplicate_choices, &duplicated);
        assert_eq!(kinds(&outcome), vec!["duplicate_choices"]);
        assert_eq!(outcome.delta, -35);
        assert_eq!(run(duplicate_choices, &baseline), RuleOutcome::none());
        assert_eq!(score(&baseline) - score(&duplicated), 35);
    }

    #[test]
    fn near_duplicates_after_token_folding() {
        let b = bank_of(&item_json(
            SCENARIO,
            r#"["Risk avoidance!", "risk-avoidance", "Risk transfer"]"#,
            2,
        ));
        assert_eq!(run(duplicate_choices, &b).delta, -35);
    }

    #[test]
    fn negative_stem_is_case_sensitive() {
        let b = bank_of(&item_json(
            "Which control is NOT required for PCI compliance?",
            r#"["a", "b"]"#,
            0,
        ));
        let outcome = run(negative_stem, &b);
        assert_eq!(kinds(&outcome), vec!["negative_stem"]);
        assert_eq!(outcome.delta, -7);
        assert_eq!(outcome.findings[0].severity, Severity::Warning);

        let lower = bank_of(&item_json("Why is this not required?", r#"["a", "b"]"#, 0));
        assert_eq!(run(negative_stem, &lower), RuleOutcome::none());
    }

    #[test]
    fn structural_failures() {
        let b = bank_of(r#"{"id": "q", "choices": ["only"], "correctIndex": 4}"#);
        let outcome = run(structure, &b);
        assert_eq!(kinds(&outcome), vec!["missing_stem", "invalid_choices"]);
        assert_eq!(outcome.delta, -120);

        let b = bank_of(r#"{"id": "q", "stem": "s", "choices": ["a", "b"], "correctIndex": 2}"#);
        assert_eq!(kinds(&run(structure, &b)), vec!["invalid_correct_index"]);

        let b = bank_of(
            r#"{"id": "q", "type": "ordering", "stem": "s", "choices": ["a", "b"], "correctOrder": [0, 0]}"#,
        );
        assert_eq!(kinds(&run(structure, &b)), vec!["invalid_correct_order"]);
    }

    #[test]
    fn stem_length_bounds() {
        let short = bank_of(&item_json("Define risk.", r#"["a", "b"]"#, 0));
        assert_eq!(run(stem_length, &short).delta, -8);
        let long_stem = vec!["word"; 121].join(" ");
        let long = bank_of(&item_json(&long_stem, r#"["a", "b"]"#, 0));
        assert_eq!(kinds(&run(stem_length, &long)), vec!["stem_too_long"]);
        let fine = bank_of(&item_json(SCENARIO, r#"["a", "b"]"#, 0));
        assert_eq!(run(stem_length, &fine), RuleOutcome::none());
    }

    #[test]
    fn absolute_terms_are_sorted() {
        let b = bank_of(&item_json(
            "You must never disable logging and always rotate keys",
            r#"["a", "b"]"#,
            0,
        ));
        let outcome = run(absolute_wording, &b);
        assert_eq!(outcome.delta, -4);
        assert!(outcome.findings[0].message.contains("always, must, never"));
    }

    #[test]
    fn cue_phrases_in_choices() {
        let b = bank_of(&item_json(
            SCENARIO,
            r#"["Rotate keys now", "Both A and C", "Reimage hosts"]"#,
            0,
        ));
        assert_eq!(run(testwise_cue, &b).delta, -8);
        let b = bank_of(&item_json(SCENARIO, r#"["NONE of the above", "x"]"#, 0));
        assert_eq!(run(testwise_cue, &b).delta, -8);
    }

    #[test]
    fn long_hedged_answer_is_outlier() {
        let b = bank_of(&item_json(
            SCENARIO,
            r#"["Isolate", "Wipe", "Notify", "Isolate the affected segment, preserve volatile evidence and notify the legal team"]"#,
            3,
        ));
        assert_eq!(kinds(&run(choice_length_outlier, &b)), vec!["choice_length_outlier"]);
        assert_eq!(run(very_short_distractor, &b).delta, -4);
    }

    #[test]
    fn keyword_cueing_compares_keyed_to_distractors() {
        let b = bank_of(&item_json(
            "Which firewall rule blocks inbound telnet traffic?",
            r#"["A rule that blocks inbound telnet traffic", "Enable audit logging", "Rotate service credentials"]"#,
            0,
        ));
        let outcome = run(keyword_cueing, &b);
        assert_eq!(outcome.delta, -6);
        assert_eq!(outcome.findings[0].severity, Severity::Graded);

        let ordering = bank_of(
            r#"{"id": "o", "type": "ordering", "stem": "Order telnet traffic steps",
                "choices": ["telnet traffic", "other"], "correctOrder": [0, 1]}"#,
        );
        assert_eq!(run(keyword_cueing, &ordering), RuleOutcome::none());
    }

    #[test]
    fn judgment_level_metadata() {
        let missing = bank_of(r#"{"id": "q", "stem": "s", "questionType": "judgment"}"#);
        assert_eq!(kinds(&run(judgment_metadata, &missing)), vec!["judgment_level_low"]);
        let low = bank_of(
            r#"{"id": "q", "stem": "s", "questionType": "judgment", "judgmentLevel": 1}"#,
        );
        assert_eq!(run(judgment_metadata, &low).delta, -5);
        let ok = bank_of(
            r#"{"id": "q", "stem": "s", "questionType": "judgment", "judgmentLevel": 3}"#,
        );
        assert_eq!(run(judgment_metadata, &ok), RuleOutcome::none());
        let recall = bank_of(r#"{"id": "q", "stem": "s", "questionType": "recall"}"#);
        assert_eq!(run(judgment_metadata, &recall), RuleOutcome::none());
    }

    #[test]
    fn scenario_bonus_and_nudges() {
        let rich = bank_of(&item_json(SCENARIO, r#"["a", "b"]"#, 0));
        let outcome = run(scenario_richness, &rich);
        assert_eq!(outcome.delta, 5);
        assert!(outcome.findings.is_empty());

        let bare = bank_of(&item_json("Define the term risk appetite.", r#"["a", "b"]"#, 0));
        let outcome = run(scenario_richness, &bare);
        assert_eq!(outcome.delta, 0);
        assert_eq!(
            kinds(&outcome),
            vec!["missing_actor_context", "missing_decision_prompt"]
        );
    }

    #[test]
    fn bank_comparison_rules() {
        let b = bank_of(
            r#"{"id": "a", "stem": "What is risk?"},
               {"id": "b", "stem": "what is RISK"},
               {"id": "c", "stem": "Other", "variantOf": "a"},
               {"id": "d", "stem": "Another", "variantOf": "gone"},
               {"id": "e", "stem": "Synthetic", "isSyntheticVariant": true},
               {"id": "f", "stem": "Synthetic", "isSyntheticVariant": true, "variantOf": "a"},
               {"id": "g", "stem": "Authored", "isSyntheticVariant": false}"#,
        );
        let tables = LintTables::new().unwrap();
        let config = LintConfig::default();
        let ctx = LintContext::new(&b, &tables, &config);
        assert_eq!(duplicate_stem(&b.items[0], &ctx).delta, -10);
        assert_eq!(duplicate_stem(&b.items[2], &ctx), RuleOutcome::none());
        assert_eq!(orphan_variant(&b.items[2], &ctx), RuleOutcome::none());
        assert_eq!(kinds(&orphan_variant(&b.items[3], &ctx)), vec!["orphan_variant"]);

        let parentless = orphan_variant(&b.items[4], &ctx);
        assert_eq!(kinds(&parentless), vec!["orphan_variant"]);
        assert_eq!(parentless.delta, -3);
        assert_eq!(orphan_variant(&b.items[5], &ctx), RuleOutcome::none());
        assert_eq!(orphan_variant(&b.items[6], &ctx), RuleOutcome::none());
    }
}
