//! C2 — Conjugator.
//!
//! Given a lowercase base verb, produces the `(action, activity, event)`
//! triple plus derived `reverseBy`/`reverseAt` names (§4.2). Consulted at
//! schema registration time (to populate each verb's conjugation) and at
//! event emission time (to fill the event's conjugation from its base
//! verb).

use std::collections::HashMap;
use std::sync::OnceLock;

use entity_types::Conjugation;

const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u'];

fn is_vowel(c: char) -> bool {
    VOWELS.contains(&c.to_ascii_lowercase())
}

fn is_consonant(c: char) -> bool {
    c.is_ascii_alphabetic() && !is_vowel(c)
}

/// Small table of verbs whose forms do not follow the regular suffix
/// rules. Consulted before the algorithmic fallback (§4.2).
fn irregulars() -> &'static HashMap<&'static str, (&'static str, &'static str)> {
    static TABLE: OnceLock<HashMap<&'static str, (&'static str, &'static str)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            ("be", ("being", "been")),
            ("have", ("having", "had")),
            ("do", ("doing", "done")),
            ("go", ("going", "gone")),
            ("make", ("making", "made")),
            ("take", ("taking", "taken")),
            ("give", ("giving", "given")),
            ("send", ("sending", "sent")),
            ("buy", ("buying", "bought")),
            ("bring", ("bringing", "brought")),
            ("build", ("building", "built")),
            ("choose", ("choosing", "chosen")),
            ("pay", ("paying", "paid")),
            ("say", ("saying", "said")),
            ("win", ("winning", "won")),
            ("lose", ("losing", "lost")),
            ("sell", ("selling", "sold")),
            ("spend", ("spending", "spent")),
            ("freeze", ("freezing", "frozen")),
            ("write", ("writing", "written")),
        ])
    })
}

/// `ends_in_cvc_short`: last three characters form consonant-vowel-consonant
/// and the whole word is short enough (≤6 chars) to warrant doubling the
/// final consonant (§4.2 gerund/past-participle rules).
fn ends_in_cvc_short(verb: &str) -> bool {
    if verb.len() > 6 {
        return false;
    }
    let chars: Vec<char> = verb.chars().collect();
    if chars.len() < 3 {
        return false;
    }
    let n = chars.len();
    is_consonant(chars[n - 1]) && is_vowel(chars[n - 2]) && is_consonant(chars[n - 3])
}

fn double_final_consonant(verb: &str) -> String {
    let mut s = verb.to_string();
    if let Some(last) = verb.chars().last() {
        s.push(last);
    }
    s
}

pub fn third_person(verb: &str) -> String {
    if verb.ends_with('s')
        || verb.ends_with('x')
        || verb.ends_with('z')
        || verb.ends_with("ch")
        || verb.ends_with("sh")
    {
        format!("{verb}es")
    } else if verb.len() >= 2 {
        let chars: Vec<char> = verb.chars().collect();
        let n = chars.len();
        if chars[n - 1] == 'y' && is_consonant(chars[n - 2]) {
            format!("{}ies", &verb[..verb.len() - 1])
        } else {
            format!("{verb}s")
        }
    } else {
        format!("{verb}s")
    }
}

pub fn gerund(verb: &str) -> String {
    if verb.ends_with("ee") {
        format!("{verb}ing")
    } else if verb.ends_with('e') {
        format!("{}ing", &verb[..verb.len() - 1])
    } else if verb.ends_with("ie") {
        format!("{}ying", &verb[..verb.len() - 2])
    } else if ends_in_cvc_short(verb) {
        format!("{}ing", double_final_consonant(verb))
    } else {
        format!("{verb}ing")
    }
}

pub fn past_participle(verb: &str) -> String {
    if verb.ends_with('e') {
        format!("{verb}d")
    } else {
        let chars: Vec<char> = verb.chars().collect();
        let n = chars.len();
        if n >= 2 && chars[n - 1] == 'y' && is_consonant(chars[n - 2]) {
            format!("{}ied", &verb[..verb.len() - 1])
        } else if ends_in_cvc_short(verb) {
            format!("{}ed", double_final_consonant(verb))
        } else {
            format!("{verb}ed")
        }
    }
}

/// Produces the full conjugation triple for a base verb (§4.2).
pub fn conjugate(base_verb: &str) -> Conjugation {
    if let Some((activity, event)) = irregulars().get(base_verb) {
        return Conjugation::new(base_verb, *activity, *event);
    }
    Conjugation::new(base_verb, gerund(base_verb), past_participle(base_verb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_conjugates_regularly() {
        let c = conjugate("create");
        assert_eq!(c.action, "create");
        assert_eq!(c.activity, "creating");
        assert_eq!(c.event, "created");
        assert_eq!(c.reverse_by, "createdBy");
        assert_eq!(c.reverse_at, "createdAt");
    }

    #[test]
    fn update_conjugates_regularly() {
        let c = conjugate("update");
        assert_eq!(c.activity, "updating");
        assert_eq!(c.event, "updated");
    }

    #[test]
    fn delete_conjugates_regularly() {
        let c = conjugate("delete");
        assert_eq!(c.activity, "deleting");
        assert_eq!(c.event, "deleted");
    }

    #[test]
    fn qualify_drops_y_for_ies_and_ied() {
        assert_eq!(third_person("qualify"), "qualifies");
        assert_eq!(gerund("qualify"), "qualifying");
        assert_eq!(past_participle("qualify"), "qualified");
    }

    #[test]
    fn close_drops_e() {
        assert_eq!(gerund("close"), "closing");
        assert_eq!(past_participle("close"), "closed");
    }

    #[test]
    fn short_cvc_verb_doubles_final_consonant() {
        // "plan": p-l-a-n -> consonant-vowel-consonant, len 4 <= 6
        assert_eq!(gerund("plan"), "planning");
        assert_eq!(past_participle("plan"), "planned");
    }

    #[test]
    fn long_cvc_verb_does_not_double() {
        // length > 6, no doubling even though it ends CVC
        assert_eq!(gerund("develop"), "developing");
    }

    #[test]
    fn irregular_verb_bypasses_suffix_rules() {
        let c = conjugate("buy");
        assert_eq!(c.activity, "buying");
        assert_eq!(c.event, "bought");
    }

    #[test]
    fn third_person_sibilant_gets_es() {
        assert_eq!(third_person("watch"), "watches");
        assert_eq!(third_person("fix"), "fixes");
    }
}
