//! Heuristic enrichment applied to every chunk at creation time.
//!
//! Each function is pure over the chunk text so thresholds and keyword lists can
//! be tuned without touching the chunker's control flow.

use crate::chunk::{QuestionType, Topic};
use crate::text::{count_tokens, split_sentences, truncate_chars};
use indexmap::IndexSet;
use regex::Regex;
use std::sync::LazyLock;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

static TOPIC_KEYWORDS: LazyLock<Vec<(Topic, Regex)>> = LazyLock::new(|| {
    vec![
        (Topic::Biaya, re(r"biaya|spp|sks|rp\.?|pembayaran")),
        (Topic::Beasiswa, re(r"beasiswa|tahfidz|prestasi|kip")),
        (Topic::ProgramStudi, re(r"prodi|program studi|fakultas|jurusan|akreditasi")),
        (Topic::Pendaftaran, re(r"daftar|registrasi|pendaftaran|pmb")),
        (Topic::Persyaratan, re(r"syarat|dokumen|ijazah|berkas")),
        (Topic::Jadwal, re(r"jadwal|gelombang|tanggal|periode")),
        (Topic::Kontak, re(r"kontak|telepon|whatsapp|email")),
        (Topic::Orientasi, re(r"orientasi|matrikulasi|ospek|pkkmb")),
        (Topic::Institusi, re(r"unsiq|universitas|visi|misi|wonosobo")),
    ]
});

const SECONDARY_KEYWORDS: [(Topic, &[&str]); 4] = [
    (Topic::Biaya, &["rp", "bayar", "spp"]),
    (Topic::Beasiswa, &["beasiswa", "gratis"]),
    (Topic::Jadwal, &["tanggal", "bulan"]),
    (Topic::Persyaratan, &["syarat", "dokumen"]),
];
const MAX_SECONDARY_TOPICS: usize = 3;

static FACTUAL: LazyLock<Regex> = LazyLock::new(|| re(r"Rp\.?|[0-9]+|adalah|merupakan"));
static PROCEDURAL: LazyLock<Regex> = LazyLock::new(|| re(r"langkah|tahap|cara|[0-9]+\.\s"));
static COMPARATIVE: LazyLock<Regex> = LazyLock::new(|| re(r"dibanding|versus|vs|lebih"));
static CONDITIONAL: LazyLock<Regex> = LazyLock::new(|| re(r"jika|apabila|dalam hal|kecuali"));
const COMPARATIVE_PIPES: usize = 5;

static CONTINUATION: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        re(r"(?i)\A(?:Selain itu|Sebagai tambahan|Selanjutnya)"),
        re(r"(?i)(?:lihat|merujuk pada|sesuai dengan)\s+(?:bagian|section)"),
        re(r"(?i)(?:seperti disebutkan|hal ini)"),
    ]
});

static SUMMARY_SIGNALS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        re(r"(?i)Rp\.?\s*[\d.,]+"),
        re(r"\d+"),
        re(r"(?i)adalah|merupakan|yaitu"),
        re(r"(?i)UNSIQ|universitas|fakultas|prodi"),
    ]
});
const SUMMARY_MIN_SENTENCE_CHARS: usize = 20;
const SUMMARY_MAX_CHARS: usize = 300;

static MONEY: LazyLock<Regex> = LazyLock::new(|| re(r"Rp\.?\s*[\d.,]+"));
static CAPITALIZED: LazyLock<Regex> = LazyLock::new(|| re(r"\b[A-Z][a-z]+\b"));
static NUMBERED_ITEM: LazyLock<Regex> = LazyLock::new(|| re(r"\d+\.\s+"));
static REQUIREMENT_WORDS: LazyLock<Regex> = LazyLock::new(|| re(r"syarat|dokumen|persyaratan"));
static DATE_WORDS: LazyLock<Regex> = LazyLock::new(|| re(r"tanggal|bulan|periode"));
static HAS_DIGIT_OR_MONEY: LazyLock<Regex> = LazyLock::new(|| re(r"Rp\.?|[0-9]+"));
static LEADING_NUMBERING: LazyLock<Regex> = LazyLock::new(|| re(r"^[\d.]+\s*"));

/// Keyword hit counts per scored topic, in [`Topic::SCORED`] order.
pub fn topic_scores(content: &str) -> Vec<(Topic, usize)> {
    let lower = content.to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .map(|(topic, pattern)| (*topic, pattern.find_iter(&lower).count()))
        .collect()
}

/// Highest-scoring topic; ties go to the earlier topic, all-zero is `Umum`.
pub fn detect_topic(content: &str) -> Topic {
    let mut best = (Topic::Umum, 0);
    for (topic, score) in topic_scores(content) {
        if score > best.1 {
            best = (topic, score);
        }
    }
    best.0
}

pub fn secondary_topics(content: &str, primary: Topic) -> Vec<Topic> {
    let lower = content.to_lowercase();
    SECONDARY_KEYWORDS
        .iter()
        .filter(|(topic, keywords)| {
            *topic != primary && keywords.iter().any(|kw| lower.contains(kw))
        })
        .map(|(topic, _)| *topic)
        .take(MAX_SECONDARY_TOPICS)
        .collect()
}

/// Question types the text can answer; never empty.
pub fn answerable_question_types(content: &str) -> Vec<QuestionType> {
    let lower = content.to_lowercase();
    let mut types = Vec::new();

    if FACTUAL.is_match(content) {
        types.push(QuestionType::Factual);
    }
    if PROCEDURAL.is_match(content) {
        types.push(QuestionType::Procedural);
    }
    if content.matches('|').count() > COMPARATIVE_PIPES || COMPARATIVE.is_match(&lower) {
        types.push(QuestionType::Comparative);
    }
    if CONDITIONAL.is_match(&lower) {
        types.push(QuestionType::Conditional);
    }

    if types.is_empty() {
        types.push(QuestionType::Factual);
    }
    types
}

/// True when the text leans on surrounding chunks ("Selain itu", "hal ini", ...).
pub fn requires_other_chunks(content: &str) -> bool {
    CONTINUATION.iter().any(|p| p.is_match(content))
}

/// Extractive summary: the one or two sentences richest in concrete signals.
pub fn summarize(content: &str) -> String {
    let sentences = split_sentences(content);
    let Some(first) = sentences.first() else {
        return truncate_chars(content, 100).to_string();
    };

    let mut scored: Vec<(usize, &str)> = sentences
        .iter()
        .enumerate()
        .filter(|(_, s)| s.chars().count() >= SUMMARY_MIN_SENTENCE_CHARS)
        .map(|(idx, s)| {
            let hits: usize = SUMMARY_SIGNALS.iter().map(|p| p.find_iter(s).count()).sum();
            let lead_boost = usize::from(idx < 2);
            (hits + lead_boost, *s)
        })
        .collect();

    if scored.is_empty() {
        return truncate_chars(first, 200).to_string();
    }

    // Stable: equal scores keep document order.
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    let top: Vec<&str> = scored.iter().take(2).map(|(_, s)| *s).collect();
    truncate_chars(&top.join(" "), SUMMARY_MAX_CHARS).to_string()
}

/// Entity names, then capitalised words, then money amounts; deduplicated.
pub fn search_keywords(content: &str, entity_names: &[String], max_keywords: usize) -> Vec<String> {
    let mut keywords: IndexSet<String> = entity_names.iter().cloned().collect();
    keywords.extend(CAPITALIZED.find_iter(content).take(10).map(|m| m.as_str().to_string()));
    keywords.extend(MONEY.find_iter(content).take(5).map(|m| m.as_str().to_string()));
    keywords.into_iter().take(max_keywords).collect()
}

/// Content-driven questions for chunks without a natural question of their own.
pub fn hypothetical_questions(content: &str, topic: Topic, entity_names: &[String]) -> Vec<String> {
    let lower = content.to_lowercase();
    let leading: Vec<&String> = entity_names.iter().take(3).collect();
    let mut questions = Vec::new();

    if MONEY.is_match(content) {
        for entity in &leading {
            questions.push(format!("Berapa biaya {entity}?"));
        }
    }
    if NUMBERED_ITEM.is_match(content) {
        questions.push(format!("Bagaimana langkah-langkah dalam {topic}?"));
    }
    if REQUIREMENT_WORDS.is_match(&lower) {
        questions.push("Apa saja persyaratan yang diperlukan?".to_string());
    }
    if DATE_WORDS.is_match(&lower) {
        questions.push("Kapan jadwal atau periodenya?".to_string());
    }

    if questions.is_empty() {
        if let Some(entity) = leading.first() {
            questions.push(format!("Informasi tentang {entity}?"));
            questions.push(format!("Apa yang dimaksud dengan {entity}?"));
        }
    }
    if questions.is_empty() {
        questions.push(topic_fallback_question(topic));
    }

    questions.truncate(5);
    questions
}

/// Question used whenever nothing content-specific could be generated.
pub fn topic_fallback_question(topic: Topic) -> String {
    match topic {
        Topic::Biaya => "Berapa biaya kuliah?".to_string(),
        Topic::Beasiswa => "Beasiswa apa yang tersedia?".to_string(),
        Topic::Pendaftaran => "Bagaimana cara mendaftar?".to_string(),
        other => format!("Informasi tentang {other}?"),
    }
}

pub fn section_questions(title: &str) -> Vec<String> {
    let lower = title.to_lowercase();
    if lower.contains("biaya") {
        vec![format!("Berapa {title}?")]
    } else if lower.contains("syarat") {
        vec![format!("Apa saja {title}?")]
    } else if lower.contains("jadwal") {
        vec![format!("Kapan {title}?")]
    } else {
        vec![format!("Apa itu {title}?"), format!("Jelaskan tentang {title}")]
    }
}

/// One question per non-subject column, at most three.
pub fn table_questions(headers: &[String], cells: &[String]) -> Vec<String> {
    let subject = cells.first().map(String::as_str).unwrap_or("ini");
    headers
        .iter()
        .skip(1)
        .take(3)
        .map(|header| format!("Berapa {} untuk {subject}?", header.to_lowercase()))
        .collect()
}

/// `1.2 Biaya Kuliah` -> `Biaya Kuliah`.
pub fn strip_numbering(title: &str) -> String {
    LEADING_NUMBERING.replace(title, "").trim().to_string()
}

/// Weighted score in `[0, 1]`.
///
/// Entity density (up to 0.3), 0.1 per answerable question type, length
/// appropriateness (up to 0.2), concrete numbers and entities (up to 0.2).
pub fn quality_score(content: &str, entity_count: usize, question_type_count: usize) -> f64 {
    let tokens = count_tokens(content);
    let mut score = 0.0;

    let entity_ratio = entity_count as f64 / (tokens as f64 / 50.0).max(1.0);
    score += (entity_ratio * 0.1).min(0.3);

    score += question_type_count as f64 * 0.1;

    if (50..=300).contains(&tokens) {
        score += 0.2;
    } else if (30..=400).contains(&tokens) {
        score += 0.1;
    }

    if HAS_DIGIT_OR_MONEY.is_match(content) {
        score += 0.1;
    }
    if entity_count > 0 {
        score += 0.1;
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_detection() {
        assert_eq!(detect_topic("Biaya SPP dibayar per semester, Rp 5.000.000"), Topic::Biaya);
        assert_eq!(detect_topic("Visi dan misi Universitas"), Topic::Institusi);
        assert_eq!(detect_topic("Tidak ada kata kunci di sini"), Topic::Umum);
    }

    #[test]
    fn test_topic_tie_prefers_earlier_topic() {
        // One hit each for biaya and jadwal.
        assert_eq!(detect_topic("biaya gelombang"), Topic::Biaya);
        let scores = topic_scores("biaya gelombang");
        assert_eq!(scores.len(), Topic::SCORED.len());
    }

    #[test]
    fn test_secondary_topics_exclude_primary() {
        let topics = secondary_topics("Beasiswa gratis SPP, syarat dokumen", Topic::Beasiswa);
        assert_eq!(topics, vec![Topic::Biaya, Topic::Persyaratan]);
    }

    #[test]
    fn test_question_types() {
        assert_eq!(answerable_question_types("tanpa angka"), vec![QuestionType::Factual]);

        let types = answerable_question_types("1. Isi formulir. Jika gagal, ulangi.");
        assert!(types.contains(&QuestionType::Procedural));
        assert!(types.contains(&QuestionType::Conditional));

        let table = "| a | b |\n| c | d |\n| e | f |";
        assert!(answerable_question_types(table).contains(&QuestionType::Comparative));
    }

    #[test]
    fn test_continuation_markers() {
        assert!(requires_other_chunks("Selain itu, mahasiswa wajib hadir."));
        assert!(requires_other_chunks("Detailnya lihat bagian biaya."));
        assert!(!requires_other_chunks("Mahasiswa wajib hadir. Selain itu juga."));
    }

    #[test]
    fn test_summary_prefers_concrete_sentences() {
        let content = "Kampus ini terletak di daerah pegunungan yang sejuk. \
                       Suasananya tenang dan nyaman untuk belajar sehari-hari. \
                       Biaya SPP adalah Rp 3.500.000 per semester untuk 2 prodi.";
        let summary = summarize(content);
        assert!(summary.starts_with("Biaya SPP adalah Rp 3.500.000"));
        assert!(summary.chars().count() <= SUMMARY_MAX_CHARS);
    }

    #[test]
    fn test_summary_of_short_text() {
        assert_eq!(summarize("Pendek."), "Pendek.");
    }

    #[test]
    fn test_keywords_are_capped_and_unique() {
        let names = vec!["Manajemen".to_string()];
        let keywords = search_keywords("Manajemen dan Akuntansi, biaya Rp 100.000", &names, 20);
        assert_eq!(keywords, vec!["Manajemen", "Akuntansi", "Rp 100.000"]);

        let many = "Aa Bb Cc Dd Ee Ff Gg Hh Ii Jj Kk";
        assert_eq!(search_keywords(many, &[], 4).len(), 4);
    }

    #[test]
    fn test_hypothetical_questions_fallbacks() {
        assert_eq!(
            hypothetical_questions("teks polos", Topic::Umum, &[]),
            vec!["Informasi tentang umum?".to_string()]
        );
        assert_eq!(
            hypothetical_questions("teks polos", Topic::Biaya, &[]),
            vec!["Berapa biaya kuliah?".to_string()]
        );

        let names = vec!["Manajemen".to_string()];
        let qs = hypothetical_questions("SPP Rp 100.000", Topic::Biaya, &names);
        assert_eq!(qs, vec!["Berapa biaya Manajemen?".to_string()]);
    }

    #[test]
    fn test_section_and_table_questions() {
        assert_eq!(section_questions("Biaya Kuliah"), vec!["Berapa Biaya Kuliah?"]);
        assert_eq!(section_questions("Persyaratan Umum"), vec!["Apa saja Persyaratan Umum?"]);
        assert_eq!(section_questions("Sejarah").len(), 2);

        let headers: Vec<String> = ["Prodi", "Biaya", "Kuota"].iter().map(|s| s.to_string()).collect();
        let cells: Vec<String> = ["Manajemen", "Rp 1", "40"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            table_questions(&headers, &cells),
            vec!["Berapa biaya untuk Manajemen?", "Berapa kuota untuk Manajemen?"]
        );
    }

    #[test]
    fn test_quality_score_bounds() {
        assert_eq!(quality_score("", 0, 0), 0.0);

        let body = "Biaya Rp 100.000 ".repeat(30);
        let score = quality_score(&body, 10, 4);
        assert!(score <= 1.0);
        assert!(score > 0.9);
    }

    #[test]
    fn test_strip_numbering() {
        assert_eq!(strip_numbering("1.2 Biaya Kuliah"), "Biaya Kuliah");
        assert_eq!(strip_numbering("Biaya"), "Biaya");
    }
}
