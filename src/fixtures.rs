//! Record builders shared by the unit tests.

use serde_json::{json, Value};

use crate::models::{
    CanonicalRecord, Category, CategoryDictionary, EpisodeMeta, RawRecord, RecordKind,
    SourceTable, SourceTables,
};

fn blank(source: SourceTable, kind: RecordKind, title: &str) -> CanonicalRecord {
    CanonicalRecord {
        source,
        kind,
        title_fr: title.to_string(),
        title_en: String::new(),
        year: None,
        cover: None,
        disc_fr: None,
        disc_en: None,
        audio_fr: None,
        audio_en: None,
        summary: None,
        series_marker: None,
        id: None,
        genres: Vec::new(),
        episode: None,
    }
}

pub fn film(title: &str, year: Option<i32>, genres: &[&str]) -> CanonicalRecord {
    CanonicalRecord {
        year,
        genres: genres.iter().map(|g| g.to_string()).collect(),
        ..blank(SourceTable::Films, RecordKind::Film, title)
    }
}

pub fn episode(title: &str, header: bool) -> CanonicalRecord {
    CanonicalRecord {
        cover: header.then(|| "cover.jpg".to_string()),
        episode: Some(EpisodeMeta::default()),
        ..blank(SourceTable::SeriesOne, RecordKind::Episode, title)
    }
}

pub fn categories(entries: &[(&str, &str)]) -> CategoryDictionary {
    let mut dict = CategoryDictionary::new();
    for (code, label) in entries {
        dict.insert(Category {
            code: code.to_string(),
            fields: vec![code.to_string()],
            label: label.to_string(),
            description: String::new(),
        });
    }
    dict
}

fn with_discs(mut record: CanonicalRecord, fr: Option<&str>, en: Option<&str>) -> CanonicalRecord {
    record.disc_fr = fr.map(str::to_string);
    record.disc_en = en.map(str::to_string);
    record
}

fn with_audio(mut record: CanonicalRecord, fr: bool, en: bool) -> CanonicalRecord {
    record.audio_fr = fr.then(|| "X".to_string());
    record.audio_en = en.then(|| "X".to_string());
    record
}

fn series_flagged(mut record: CanonicalRecord) -> CanonicalRecord {
    record.series_marker = Some("X".to_string());
    record
}

/// A small mixed catalog: films (some series-flagged), headers, episodes.
pub fn sample_catalog() -> Vec<CanonicalRecord> {
    let nine = ["HOR", "SCFI", "DRAME", "A", "B", "C", "D", "E", "F"];
    vec![
        with_audio(with_discs(film("Alien", Some(1979), &["HOR", "SCFI"]), Some("D1"), Some("D1")), true, true),
        with_audio(with_discs(film("Aliens", Some(1986), &["HOR", "SCFI"]), Some("D1"), None), true, false),
        with_audio(with_discs(film("Psychose", Some(1960), &["HOR"]), Some("D2"), Some("D2")), false, true),
        with_discs(film("Amélie", Some(2001), &["DRAME"]), Some("D2"), None),
        series_flagged(with_audio(
            with_discs(film("Twin Peaks - 01", Some(1990), &["DRAME", "HOR"]), Some("D3"), Some("D3")),
            true,
            false,
        )),
        series_flagged(with_discs(film("Twin Peaks - 02", Some(1990), &["DRAME"]), Some("D3"), None)),
        film("Sans titre", None, &[]),
        film("Tout", Some(2001), &nine),
        with_discs(episode("Friends", true), Some("D4"), Some("D4")),
        with_audio(with_discs(episode("Friends - 01", false), Some("D4"), Some("D4")), true, true),
        with_audio(with_discs(episode("Friends - 02", false), Some("D4"), Some("D5")), true, false),
        with_discs(episode("Friends - 03", false), Some("D5"), None),
        with_discs(episode("Lost", true), Some("D6"), None),
        with_discs(episode("Lost - 01", false), Some("D6"), None),
        with_discs(episode("Orphan - 01", false), Some("D4"), None),
    ]
}

fn rows(values: Vec<Value>) -> Vec<RawRecord> {
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// Raw source tables: two films (one with a summary), a two-episode series
/// whose header sits in the second series table, two categories.
pub fn sample_tables() -> SourceTables {
    SourceTables {
        films: rows(vec![
            json!({"TITREFRANCAIS": "Alien", "TITREANGLAIS": "Alien", "ANNEE": "1979",
                   "AUDIOFRANCAIS": "X", "HOR": "X", "SCFI": "X"}),
            json!({"TITREFRANCAIS": "Psychose", "TITREANGLAIS": "Psycho", "ANNEE": 1960, "HOR": "X"}),
        ]),
        series_one: rows(vec![
            json!({"TITREFRANCAIS": "Friends - 01", "ANNEE": 1994}),
            json!({"TITREFRANCAIS": "Friends - 02", "ANNEE": 1994}),
        ]),
        series_two: rows(vec![json!({"TITREFRANCAIS": "Friends", "POCHETTE": "friends.jpg"})]),
        summaries: rows(vec![json!({"TITREFRANCAIS": "ALIEN", "TITREANGLAIS": " alien ",
                                    "ANNEE": "1979", "RESUME": "Un cargo spatial..."})]),
        categories: rows(vec![
            json!({"code": "HOR", "labelFR": "Horreur"}),
            json!({"code": "SCFI", "labelFR": "Science-fiction"}),
        ]),
    }
}
