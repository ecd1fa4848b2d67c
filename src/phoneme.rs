//! ISO-15919 consonant and vowel tables with their Devanagari, IPA and
//! English renderings.

/// One phoneme in its four written forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phoneme {
    pub iso: &'static str,
    pub hindi: &'static str,
    pub ipa: &'static str,
    pub eng_trans: &'static str,
}

const fn ph(
    iso: &'static str,
    hindi: &'static str,
    ipa: &'static str,
    eng_trans: &'static str,
) -> Phoneme {
    Phoneme {
        iso,
        hindi,
        ipa,
        eng_trans,
    }
}

pub const CONSONANTS: [Phoneme; 33] = [
    ph("ka", "क", "k", "k"),
    ph("kha", "ख", "kʰ", "kh"),
    ph("ga", "ग", "g", "g"),
    ph("gha", "घ", "gʱ", "gh"),
    ph("ṅa", "ङ", "ŋ", "ṅ"),
    ph("ca", "च", "c", "c"),
    ph("cha", "छ", "cʰ", "ch"),
    ph("ja", "ज", "ɟ", "j"),
    ph("jha", "झ", "ɟʱ", "jh"),
    ph("ña", "ञ", "ɲ", "ñ"),
    ph("ṭa", "ट", "ʈ", "ṭ"),
    ph("ṭha", "ठ", "ʈʰ", "ṭh"),
    ph("ḍa", "ड", "ɖ", "ḍ"),
    ph("ḍha", "ढ", "ɖʱ", "ḍh"),
    ph("na", "न", "n", "n"),
    ph("ta", "त", "t", "t"),
    ph("tha", "थ", "tʰ", "th"),
    ph("da", "द", "d", "d"),
    ph("dha", "ध", "dʱ", "dh"),
    ph("na", "न", "n̪", "n"),
    ph("pa", "प", "p", "p"),
    ph("pha", "फ़", "pʰ", "ph"),
    ph("ba", "ब", "b", "b"),
    ph("bha", "भ", "bʱ", "bh"),
    ph("ma", "म", "m", "m"),
    ph("ya", "य", "j", "y"),
    ph("ra", "र", "r", "r"),
    ph("la", "ल", "l", "l"),
    ph("va", "व", "v", "v"),
    ph("śa", "श", "ʃ", "ś"),
    ph("ṣa", "ष", "ʂ", "ṣ"),
    ph("sa", "स", "s", "s"),
    ph("ha", "ह", "h", "h"),
];

pub const VOWELS: [Phoneme; 11] = [
    ph("a", "अ", "ə", "a"),
    ph("ā", "आ", "aː", "ā"),
    ph("i", "इ", "ɪ", "i"),
    ph("ī", "ई", "iː", "ī"),
    ph("u", "उ", "ʊ", "u"),
    ph("ū", "ऊ", "uː", "ū"),
    ph("ē", "ए", "eː", "ē"),
    ph("ai", "ऐ", "ɛː", "ai"),
    ph("ō", "ओ", "oː", "ō"),
    ph("au", "औ", "ɔː", "au"),
    ph("_", "_", "_", "_"),
];

pub fn consonant(iso: &str) -> Option<&'static Phoneme> {
    CONSONANTS.iter().find(|p| p.iso == iso)
}

pub fn vowel(iso: &str) -> Option<&'static Phoneme> {
    VOWELS.iter().find(|p| p.iso == iso)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(consonant("kha").map(|p| p.hindi), Some("ख"));
        assert_eq!(vowel("a").map(|p| p.hindi), Some("अ"));
        assert!(consonant("zz").is_none());
        // the first "na" wins
        assert_eq!(consonant("na").map(|p| p.ipa), Some("n"));
    }
}
