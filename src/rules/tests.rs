use std::sync::Arc;

use super::*;
use crate::data::{AnnotatedData, AnnotatedStringData};
use crate::error::RuleError;
use crate::feature::FeatureStruct;
use crate::matcher::{Match, MatcherSettings};
use crate::pattern::Pattern;
use crate::sequence::AnnotationId;
use crate::span::{Direction, Span};
use crate::test_support::{
    annotated_string, any_segment, has_symbol, is_segment, seg, seg_str, segment_fs, str_rep, PHONETIC,
};

type Data = AnnotatedStringData;

fn surface(data: &Data) -> String {
    data.surface(str_rep)
}

fn segment_settings() -> MatcherSettings<usize> {
    MatcherSettings { filter: Arc::new(is_segment), ..Default::default() }
}

fn segments_in(data: &Data, span: Span<usize>) -> Vec<AnnotationId> {
    data.annotations()
        .contained_in(span, Direction::LeftToRight)
        .into_iter()
        .filter(|&id| is_segment(data.annotations().get(id).expect("iterated node is live")))
        .collect()
}

/// Overwrite every segment in the "target" capture with one symbol.
fn overlay_target(input: &mut Data, found: &Match<usize>, symbol: &str) -> Result<(), RuleError> {
    let target = found.group("target").expect("target group captured");
    let overlay = FeatureStruct::build(&PHONETIC).symbol(symbol).value();
    for id in segments_in(input, target) {
        if let Some(ann) = input.annotations_mut().get_mut(id) {
            ann.feature_struct_mut().priority_union(&overlay, &found.bindings)?;
        }
    }
    Ok(())
}

/// A rule rewriting segment `from` into segment `to`.
fn rewrite_rule(from: char, to: char) -> PatternRule<Data, usize> {
    let pattern = Pattern::new().group("target", |g| g.annotation(seg_str(from))).value();
    let spec = DefaultPatternRuleSpec::new(
        pattern,
        Box::new(move |input: &mut Data, found: &Match<usize>| {
            for id in segments_in(input, found.group("target").expect("target group captured")) {
                if let Some(ann) = input.annotations_mut().get_mut(id) {
                    ann.set_feature_struct(segment_fs(to));
                }
            }
            Ok(None)
        }),
    )
    .named(format!("{from}-to-{to}"));
    PatternRule::with_settings(spec, segment_settings()).expect("pattern compiles")
}

#[test]
fn feature_synthesis_with_variable_agreement() {
    // Lower a low vowel between a consonant and a consonant that
    // disagrees with it in voicing.
    let pattern = Pattern::new()
        .group("leftEnv", |g| {
            g.annotation(
                FeatureStruct::build(&PHONETIC).symbol("seg").symbol("cons+").feature("voice").equal_to_variable("a").value(),
            )
        })
        .group("target", |g| g.annotation(seg(&["cons-", "low+"])))
        .group("rightEnv", |g| {
            g.annotation(
                FeatureStruct::build(&PHONETIC)
                    .symbol("seg")
                    .symbol("cons+")
                    .feature("voice")
                    .not()
                    .equal_to_variable("a")
                    .value(),
            )
        })
        .value();

    let spec = DefaultPatternRuleSpec::new(
        pattern,
        Box::new(|input: &mut Data, found: &Match<usize>| {
            overlay_target(input, found, "low-")?;
            Ok(None)
        }),
    )
    .named("lowering");

    let rule = PatternRule::with_settings(spec, segment_settings()).unwrap();
    let mut input = annotated_string("fazk");
    assert!(rule.apply(&mut input).unwrap());

    let a_id = input.annotations().iter(Direction::LeftToRight).nth(1).unwrap();
    let a_fs = input.annotations().get(a_id).unwrap().feature_struct();
    assert!(has_symbol(a_fs, "low-"));
    assert!(!has_symbol(a_fs, "low+"));
}

#[test]
fn inapplicable_rule_is_a_silent_skip() {
    let spec = DefaultPatternRuleSpec::with_gate(
        Pattern::new().annotation(any_segment()).value(),
        Box::new(|_: &mut Data, _: &Match<usize>| panic!("the action must not run")),
        Box::new(|_: &Data| false),
    );
    let rule = PatternRule::new(spec).unwrap();
    let mut input = annotated_string("ma");
    assert!(!rule.apply(&mut input).unwrap());
}

#[test]
fn batch_dispatches_to_the_matching_sub_rule() {
    let m_rule = DefaultPatternRuleSpec::new(
        Pattern::new().group("target", |g| g.annotation(seg_str('m'))).value(),
        Box::new(|input: &mut Data, found: &Match<usize>| {
            overlay_target(input, found, "back-")?;
            Ok(None)
        }),
    )
    .named("m-rule");
    let a_rule = DefaultPatternRuleSpec::new(
        Pattern::new().group("target", |g| g.annotation(seg_str('a'))).value(),
        Box::new(|input: &mut Data, found: &Match<usize>| {
            overlay_target(input, found, "low-")?;
            Ok(None)
        }),
    )
    .named("a-rule");

    let batch = BatchPatternRuleSpec::new(vec![Box::new(m_rule), Box::new(a_rule)]);
    let rule = PatternRule::with_settings(batch, segment_settings()).unwrap();

    // The input matches only the second sub-rule; exactly its action runs.
    let mut input = annotated_string("a");
    assert!(rule.apply(&mut input).unwrap());
    let a_fs_owner = input.annotations().first(Direction::LeftToRight).unwrap();
    let a_fs = input.annotations().get(a_fs_owner).unwrap().feature_struct();
    assert!(has_symbol(a_fs, "low-"));
    assert!(has_symbol(a_fs, "back+"), "the first sub-rule's action must not have run");
}

#[test]
fn vetoed_sub_rule_does_not_shadow_later_ones() {
    // Both sub-rules match "a", but the first one's gate rejects the
    // input, so matching falls through to the second alternative.
    let gated = DefaultPatternRuleSpec::with_gate(
        Pattern::new().group("target", |g| g.annotation(seg_str('a'))).value(),
        Box::new(|input: &mut Data, found: &Match<usize>| {
            overlay_target(input, found, "back-")?;
            Ok(None)
        }),
        Box::new(|_: &Data| false),
    );
    let open = DefaultPatternRuleSpec::new(
        Pattern::new().group("target", |g| g.annotation(seg_str('a'))).value(),
        Box::new(|input: &mut Data, found: &Match<usize>| {
            overlay_target(input, found, "low-")?;
            Ok(None)
        }),
    );

    let batch = BatchPatternRuleSpec::new(vec![Box::new(gated), Box::new(open)]);
    let rule = PatternRule::with_settings(batch, segment_settings()).unwrap();

    let mut input = annotated_string("a");
    assert!(rule.apply(&mut input).unwrap());
    let id = input.annotations().first(Direction::LeftToRight).unwrap();
    let fs = input.annotations().get(id).unwrap().feature_struct();
    assert!(has_symbol(fs, "low-"));
    assert!(has_symbol(fs, "back+"));
}

#[test]
fn metathesis_swaps_the_captured_groups() {
    let pattern = Pattern::new()
        .group("1", |g| g.annotation(seg_str('u')))
        .group("2", |g| g.annotation(seg_str('i')))
        .value();
    let spec = DefaultPatternRuleSpec::new(
        pattern,
        Box::new(|input: &mut Data, found: &Match<usize>| {
            let first = found.group("1").expect("group 1 captured");
            let second = found.group("2").expect("group 2 captured");
            let first_ids = segments_in(input, first);
            let second_ids = segments_in(input, second);
            let annotations = input.annotations_mut();
            for id in first_ids {
                annotations.update_span(id, second);
            }
            for id in second_ids {
                annotations.update_span(id, first);
            }
            Ok(None)
        }),
    )
    .named("metathesis");

    let rule = PatternRule::with_settings(spec, segment_settings()).unwrap();
    let mut input = annotated_string("mui");
    // A morph annotation covering the whole word must survive the swap.
    let morph_fs = FeatureStruct::build(&PHONETIC).symbol("word").mutable_value();
    let morph = input.add_annotation(0, 3, morph_fs);

    assert!(rule.apply(&mut input).unwrap());
    assert_eq!(surface(&input), "miu");
    assert!(input.annotations().contains(morph));
    assert_eq!(input.annotations().get(morph).unwrap().span(), Span::new(0, 3));
}

#[test]
fn epenthesis_inserts_material() {
    // Word-final vowel insertion after a consonant.
    let pattern = Pattern::new().annotation(seg(&["cons+"])).value();
    let settings = MatcherSettings { anchored_to_end: true, ..segment_settings() };
    let spec = DefaultPatternRuleSpec::new(
        pattern,
        Box::new(|input: &mut Data, found: &Match<usize>| {
            let end = found.span.end();
            let inserted = input.annotations_mut().add_span(Span::new(end, end + 1), segment_fs('a'));
            Ok(Some(inserted))
        }),
    )
    .named("final-vowel");

    let rule = PatternRule::with_settings(spec, settings).unwrap();
    let mut input = annotated_string("mn");
    assert!(rule.apply(&mut input).unwrap());
    assert_eq!(surface(&input), "mna");
}

#[test]
fn narrowing_deletes_matched_material() {
    let pattern = Pattern::new().group("target", |g| g.annotation(seg_str('h'))).value();
    let spec = DefaultPatternRuleSpec::new(
        pattern,
        Box::new(|input: &mut Data, found: &Match<usize>| {
            for id in segments_in(input, found.group("target").expect("target group captured")) {
                input.annotations_mut().discard(id);
            }
            Ok(None)
        }),
    )
    .named("h-deletion");

    let rule = PatternRule::with_settings(spec, segment_settings()).unwrap();
    let mut input = annotated_string("thhe");
    assert!(rule.apply(&mut input).unwrap());
    assert_eq!(surface(&input), "te");
}

#[test]
fn resume_point_controls_reapplication() {
    // a b → a a: resuming before the rewritten material lets the rule
    // feed itself; the default resume point does not.
    fn assimilation(resume_before: bool) -> PatternRule<Data, usize> {
        let pattern = Pattern::new()
            .annotation(seg_str('a'))
            .group("target", |g| g.annotation(seg_str('b')))
            .value();
        let spec = DefaultPatternRuleSpec::new(
            pattern,
            Box::new(move |input: &mut Data, found: &Match<usize>| {
                for id in segments_in(input, found.group("target").expect("target group captured")) {
                    if let Some(ann) = input.annotations_mut().get_mut(id) {
                        ann.set_feature_struct(segment_fs('a'));
                    }
                }
                Ok(if resume_before { Some(found.start) } else { None })
            }),
        )
        .named("assimilation");
        PatternRule::with_settings(spec, segment_settings()).expect("pattern compiles")
    }

    let mut input = annotated_string("abb");
    assert!(assimilation(false).apply(&mut input).unwrap());
    assert_eq!(surface(&input), "aab");

    let mut input = annotated_string("abb");
    assert!(assimilation(true).apply(&mut input).unwrap());
    assert_eq!(surface(&input), "aaa");
}

#[test]
fn non_converging_rule_raises_infinite_loop() {
    // The action never changes its (dirty-marked) input and resumes at
    // the same node; the application bound must trip.
    let spec = DefaultPatternRuleSpec::new(
        Pattern::new().annotation(any_segment()).value(),
        Box::new(|_: &mut Data, found: &Match<usize>| Ok(Some(found.start))),
    )
    .named("no-op");
    let rule = PatternRule::new(spec).unwrap().with_max_applications(25);

    let mut input = annotated_string("a");
    match rule.apply(&mut input) {
        Err(RuleError::InfiniteLoop { rule, applications }) => {
            assert_eq!(rule, "no-op");
            assert_eq!(applications, 26);
        }
        other => panic!("expected an infinite-loop error, got {other:?}"),
    }
}

#[test]
fn rewritten_annotations_are_marked_dirty() {
    let pattern = Pattern::new().group("target", |g| g.annotation(seg(&["cons-", "low+"]))).value();
    let spec = DefaultPatternRuleSpec::new(
        pattern,
        Box::new(|input: &mut Data, found: &Match<usize>| {
            overlay_target(input, found, "low-")?;
            Ok(None)
        }),
    );
    let rule = PatternRule::with_settings(spec, segment_settings()).unwrap();

    let mut input = annotated_string("ma");
    assert!(rule.apply(&mut input).unwrap());
    let ids: Vec<AnnotationId> = input.annotations().iter(Direction::LeftToRight).collect();
    assert!(!input.annotations().get(ids[0]).unwrap().is_dirty());
    assert!(input.annotations().get(ids[1]).unwrap().is_dirty());

    // The next pass starts clean; with nothing left to rewrite, no
    // annotation ends up marked.
    assert!(!rule.apply(&mut input).unwrap());
    assert!(!input.annotations().get(ids[1]).unwrap().is_dirty());
}

#[test]
fn simultaneous_mode_ignores_its_own_output() {
    // b-spreading: a → b after b, resuming at the match start so the
    // iterative strategy feeds itself.
    fn spreading() -> DefaultPatternRuleSpec<Data, usize> {
        let pattern = Pattern::new()
            .annotation(seg_str('b'))
            .group("target", |g| g.annotation(seg_str('a')))
            .value();
        DefaultPatternRuleSpec::new(
            pattern,
            Box::new(|input: &mut Data, found: &Match<usize>| {
                for id in segments_in(input, found.group("target").expect("target group captured")) {
                    if let Some(ann) = input.annotations_mut().get_mut(id) {
                        ann.set_feature_struct(segment_fs('b'));
                    }
                }
                Ok(Some(found.start))
            }),
        )
        .named("spreading")
    }

    let mut input = annotated_string("baa");
    let iterative = PatternRule::with_settings(spreading(), segment_settings()).unwrap();
    assert!(iterative.apply(&mut input).unwrap());
    assert_eq!(surface(&input), "bbb");

    let mut input = annotated_string("baa");
    let simultaneous = PatternRule::with_settings(spreading(), segment_settings())
        .unwrap()
        .with_mode(ApplicationMode::Simultaneous);
    assert!(simultaneous.apply(&mut input).unwrap());
    assert_eq!(surface(&input), "bba");
}

#[test]
fn cascade_modes_differ_in_reapplication() {
    // Counter-feeding order: b→g is listed before a→b.
    let mut input = annotated_string("a");
    let linear = RuleCascade::new(vec![rewrite_rule('b', 'g'), rewrite_rule('a', 'b')]);
    assert!(linear.apply(&mut input).unwrap());
    assert_eq!(surface(&input), "b");

    let mut input = annotated_string("a");
    let nonlinear =
        RuleCascade::new(vec![rewrite_rule('b', 'g'), rewrite_rule('a', 'b')]).with_mode(CascadeMode::NonLinear);
    assert!(nonlinear.apply(&mut input).unwrap());
    assert_eq!(surface(&input), "g");
}

#[test]
fn cyclic_cascade_raises_infinite_loop() {
    let cascade = RuleCascade::new(vec![rewrite_rule('a', 'b'), rewrite_rule('b', 'a')])
        .with_mode(CascadeMode::NonLinear)
        .with_max_passes(10)
        .named("cycle");

    let mut input = annotated_string("a");
    match cascade.apply(&mut input) {
        Err(RuleError::InfiniteLoop { rule, .. }) => assert_eq!(rule, "cycle"),
        other => panic!("expected an infinite-loop error, got {other:?}"),
    }
}
