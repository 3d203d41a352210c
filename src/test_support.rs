//! Shared phonetic fixtures for tests: a small feature system, a
//! per-character segment table, and helpers for reading feature values
//! back out of annotations.

use once_cell::sync::Lazy;

use crate::data::AnnotatedStringData;
use crate::feature::{FeatureStruct, FeatureSystem, FeatureValue, SimpleValue};
use crate::sequence::Annotation;

pub(crate) static PHONETIC: Lazy<FeatureSystem> = Lazy::new(|| {
    FeatureSystem::builder()
        .symbolic("type", &["seg", "bdry", "word"])
        .symbolic("pos", &["noun", "verb", "adj", "adv", "det"])
        .symbolic("syl", &["syl+", "syl-"])
        .symbolic("cons", &["cons+", "cons-"])
        .symbolic("son", &["son+", "son-"])
        .symbolic("voice", &["voice+", "voice-"])
        .symbolic("high", &["high+", "high-"])
        .symbolic("low", &["low+", "low-"])
        .symbolic("back", &["back+", "back-"])
        .string("strRep")
        .build()
        .expect("fixture feature system is well formed")
});

/// Per-character feature symbols, in the style of a character-definition
/// table.
fn char_symbols(ch: char) -> Option<Vec<&'static str>> {
    let symbols = match ch {
        'a' => vec!["syl+", "cons-", "son+", "voice+", "high-", "low+", "back+"],
        'e' => vec!["syl+", "cons-", "son+", "voice+", "high-", "low-", "back-"],
        'i' => vec!["syl+", "cons-", "son+", "voice+", "high+", "low-", "back-"],
        'o' => vec!["syl+", "cons-", "son+", "voice+", "high-", "low-", "back+"],
        'u' => vec!["syl+", "cons-", "son+", "voice+", "high+", "low-", "back+"],
        'p' | 't' | 'k' | 'f' | 's' | 'h' => vec!["syl-", "cons+", "son-", "voice-"],
        'b' | 'd' | 'g' | 'v' | 'z' => vec!["syl-", "cons+", "son-", "voice+"],
        'm' | 'n' | 'l' | 'r' | 'w' | 'y' => vec!["syl-", "cons+", "son+", "voice+"],
        _ => return None,
    };
    Some(symbols)
}

/// Feature structure for one segment character (mutable: rule actions
/// rewrite these in place).
pub(crate) fn segment_fs(ch: char) -> FeatureStruct {
    let mut builder = FeatureStruct::build(&PHONETIC).symbol("seg");
    for symbol in char_symbols(ch).unwrap_or_else(|| panic!("no segment definition for '{ch}'")) {
        builder = builder.symbol(symbol);
    }
    builder
        .feature("strRep")
        .equal_to(&ch.to_string())
        .mutable_value()
}

fn boundary_fs(ch: char) -> FeatureStruct {
    FeatureStruct::build(&PHONETIC)
        .symbol("bdry")
        .feature("strRep")
        .equal_to(&ch.to_string())
        .mutable_value()
}

/// Annotate every character of `text` as a segment or boundary, the way
/// the original string-data fixtures do.
pub(crate) fn annotated_string(text: &str) -> AnnotatedStringData {
    let mut data = AnnotatedStringData::new(text);
    for (index, ch) in text.char_indices() {
        let fs = match char_symbols(ch) {
            Some(_) => segment_fs(ch),
            None => boundary_fs(ch),
        };
        data.add_annotation(index, index + ch.len_utf8(), fs);
    }
    data
}

/// True if the annotation's value for the symbol's feature can be that
/// symbol.
pub(crate) fn has_symbol(fs: &FeatureStruct, symbol: &str) -> bool {
    let Some((feature, mask)) = PHONETIC.symbol_mask(symbol) else {
        return false;
    };
    match fs.get(feature) {
        Some(FeatureValue::Simple(SimpleValue::Symbolic { mask: value, .. })) => value & mask != 0,
        _ => false,
    }
}

pub(crate) fn is_segment(ann: &Annotation<usize>) -> bool {
    has_symbol(ann.feature_struct(), "seg")
}

/// Surface rendering: each segment/boundary annotation's `strRep`, in
/// span order.
pub(crate) fn str_rep(ann: &Annotation<usize>) -> Option<String> {
    let str_feature = PHONETIC.feature("strRep")?;
    match ann.feature_struct().get(str_feature) {
        Some(FeatureValue::Simple(SimpleValue::Str { values, negated: false })) => {
            values.iter().next().cloned()
        }
        _ => None,
    }
}

/// Constraint matching any segment.
pub(crate) fn any_segment() -> FeatureStruct {
    FeatureStruct::build(&PHONETIC).symbol("seg").value()
}

/// Constraint built from symbols, e.g. `seg(&["syl-", "voice+"])`.
pub(crate) fn seg(symbols: &[&str]) -> FeatureStruct {
    let mut builder = FeatureStruct::build(&PHONETIC).symbol("seg");
    for symbol in symbols {
        builder = builder.symbol(symbol);
    }
    builder.value()
}

/// Constraint matching a specific surface character.
pub(crate) fn seg_str(ch: char) -> FeatureStruct {
    FeatureStruct::build(&PHONETIC)
        .symbol("seg")
        .feature("strRep")
        .equal_to(&ch.to_string())
        .value()
}
