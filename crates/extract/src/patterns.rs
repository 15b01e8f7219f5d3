//! Regex table driving entity extraction.
//!
//! Keyword anchors are case-insensitive, capitalised-name captures are not, so
//! `Prodi Teknik Informatika adalah` stops at the first lowercase word.
//! Every pattern exposes the entity surface string as capture group 1.

use crate::schema::EntityType;
use regex::Regex;
use std::sync::LazyLock;

const MONTHS: &str =
    "Januari|Februari|Maret|April|Mei|Juni|Juli|Agustus|September|Oktober|November|Desember";

pub struct PatternSet {
    pub entity_type: EntityType,
    pub patterns: Vec<Regex>,
}

pub static PATTERNS: LazyLock<Vec<PatternSet>> = LazyLock::new(|| {
    let table: Vec<(EntityType, Vec<String>)> = vec![
        (
            EntityType::Prodi,
            vec![
                r"(?i:program studi|prodi)[ \t]+([A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)*)".into(),
                r"(?i)\b(Teknik Informatika|Keperawatan|Kebidanan|Manajemen|Akuntansi|Pendidikan Agama Islam|Pendidikan Bahasa Arab|Arsitektur|Teknik Sipil|Teknik Mesin|Ilmu Hukum|Perbankan Syariah)\b".into(),
            ],
        ),
        (
            EntityType::Fakultas,
            vec![
                r"((?i:fakultas)[ \t]+[A-Z][a-z]+(?:[ \t]+(?:(?:dan|&)[ \t]+)?[A-Z][a-z]+)*(?:[ \t]+\([A-Z]+\))?)".into(),
                r"\b(FASTIKOM|FIKES|FSH|FITK|FKSP)\b".into(),
            ],
        ),
        (
            EntityType::Beasiswa,
            vec![
                r"(?i:beasiswa)[ \t]+([A-Z][a-z]+(?:[ \t]+[A-Z][a-z0-9]+)*)".into(),
                r"(?i)\b(Beasiswa Tahfidz|Beasiswa Prestasi|KIP-K|BIDIKMISI|PPA)\b".into(),
            ],
        ),
        (
            EntityType::Biaya,
            vec![
                r"(?i:rp)\.?[ \t]*(\d+(?:[.,]\d+)*)".into(),
                r"(\d+(?:[.,]\d+)*)[ \t]*(?i:rupiah|juta)\b".into(),
            ],
        ),
        (
            EntityType::Tanggal,
            vec![
                format!(r"(?i)\b(\d{{1,2}}[ \t]+(?:{MONTHS})[ \t]+\d{{4}})\b"),
                r"\b(\d{1,2}[-/]\d{1,2}[-/]\d{2,4})\b".into(),
            ],
        ),
        (
            EntityType::Durasi,
            vec![r"(?i)\b(\d+[ \t]*(?:semester|tahun|bulan|minggu|hari))\b".into()],
        ),
        (
            EntityType::Kuota,
            vec![
                r"(?i)\b(kuota[: \t]+\d+)".into(),
                r"(?i)\b(\d+[ \t]*mahasiswa)\b".into(),
            ],
        ),
        (
            EntityType::Langkah,
            vec![r"(?i)\b((?:langkah|tahap|step)[ \t]+\d+)\b".into()],
        ),
        (
            EntityType::Syarat,
            vec![r"(?i)\bsyarat[: \t]+([^\n]+)".into()],
        ),
        (
            EntityType::Dokumen,
            vec![
                r"(?i)\b(?:dokumen|berkas)[: \t]+([^\n]+)".into(),
                r"\b(Ijazah|SKHUN|KTP|KK|Akta|Foto|Surat)\b".into(),
            ],
        ),
    ];

    table
        .into_iter()
        .map(|(entity_type, sources)| PatternSet {
            entity_type,
            patterns: sources
                .iter()
                .map(|s| Regex::new(s).expect("entity pattern must compile"))
                .collect(),
        })
        .collect()
});

/// All raw observations in `content`, in table order: `(type, surface string)`.
pub fn observe(content: &str) -> Vec<(EntityType, String)> {
    let mut observations = Vec::new();

    for set in PATTERNS.iter() {
        for pattern in &set.patterns {
            for caps in pattern.captures_iter(content) {
                if let Some(m) = caps.get(1) {
                    observations.push((set.entity_type, m.as_str().trim().to_string()));
                }
            }
        }
    }

    observations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names_of(content: &str, entity_type: EntityType) -> Vec<String> {
        observe(content)
            .into_iter()
            .filter(|(t, _)| *t == entity_type)
            .map(|(_, n)| n)
            .collect()
    }

    #[test]
    fn test_every_type_has_patterns() {
        for entity_type in EntityType::ALL {
            assert!(PATTERNS.iter().any(|s| s.entity_type == entity_type));
        }
    }

    #[test]
    fn test_prodi_capture_stops_at_lowercase() {
        let names = names_of("Program Studi Teknik Informatika adalah prodi unggulan.", EntityType::Prodi);
        assert_eq!(names[0], "Teknik Informatika");
    }

    #[test]
    fn test_money_capture_drops_trailing_period() {
        let names = names_of("Biaya daftar Rp 250.000.", EntityType::Biaya);
        assert_eq!(names, vec!["250.000".to_string()]);
    }

    #[test]
    fn test_dates_and_durations() {
        let content = "Pendaftaran ditutup 17 Agustus 2025, masa studi 8 semester.";
        assert_eq!(names_of(content, EntityType::Tanggal), vec!["17 Agustus 2025"]);
        assert_eq!(names_of(content, EntityType::Durasi), vec!["8 semester"]);
    }

    #[test]
    fn test_requirement_runs_to_end_of_line() {
        let names = names_of("Syarat: lulus SMA sederajat\nlainnya", EntityType::Syarat);
        assert_eq!(names, vec!["lulus SMA sederajat"]);
    }
}
