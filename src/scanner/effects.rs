//! Spell-effect classification: the one piece of domain knowledge the
//! scanner and the spell-block rewriter share without needing the injected
//! game-data interface. All four sets are bit-exact per `spec.md` §6.

use crate::catalog::patterns::Reference;
use std::collections::HashSet;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectClass {
    Summoning,
    Enchantment,
    None,
}

static SUMMONING_EFFECTS: LazyLock<HashSet<i64>> = LazyLock::new(|| {
    [
        1, 21, 31, 37, 38, 43, 50, 54, 62, 89, 93, 119, 126, 130, 137, 10001, 10021, 10031, 10037,
        10038, 10043, 10050, 10054, 10062, 10089, 10093, 10119, 10126, 10130, 10137,
    ]
    .into_iter()
    .collect()
});

static ENCHANTMENT_EFFECTS: LazyLock<HashSet<i64>> =
    LazyLock::new(|| [81, 10081, 10082, 10084, 10085, 10086].into_iter().collect());

static KNOWN_SUMMONING_SPELL_IDS: LazyLock<HashSet<u32>> = LazyLock::new(|| {
    [721, 724, 733, 795, 805, 813, 818, 847, 875, 893, 900, 920, 1091].into_iter().collect()
});

static KNOWN_SUMMONING_SPELL_NAMES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "animate skeleton",
        "horde of skeletons",
        "raise skeletons",
        "reanimation",
        "pale riders",
        "revive lictor",
        "living mercury",
        "king of elemental earth",
        "summon fire elemental",
        "pack of wolves",
        "contact forest giant",
        "infernal disease",
        "hannya pact",
        "swarm",
        "creeping doom",
    ]
    .into_iter()
    .collect()
});

/// Classify a known `#effect` id.
pub fn classify_effect_id(effect_id: i64) -> EffectClass {
    if SUMMONING_EFFECTS.contains(&effect_id) {
        EffectClass::Summoning
    } else if ENCHANTMENT_EFFECTS.contains(&effect_id) {
        EffectClass::Enchantment
    } else {
        EffectClass::None
    }
}

/// Fallback classification when no `#effect` was seen in the block: does
/// the `#copyspell`/`#selectspell` target match one of the fixed
/// known-summoning-spell sets?
pub fn classify_copy_reference(reference: &Reference) -> EffectClass {
    let is_known_summoning = match reference {
        Reference::Id(id) => KNOWN_SUMMONING_SPELL_IDS.contains(id),
        Reference::Name(name) => KNOWN_SUMMONING_SPELL_NAMES.contains(name.as_str()),
    };
    if is_known_summoning {
        EffectClass::Summoning
    } else {
        EffectClass::None
    }
}
