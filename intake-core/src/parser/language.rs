//! Language detection and the per-language label strings the HTML
//! extractor looks for.

/// Languages the label tables cover. Anything else falls back to
/// [`Language::En`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    En,
    De,
    Ja,
    Th,
}

/// The label text a given language uses for each of the four fields the
/// HTML extractor looks up by adjacent-cell match.
pub struct LabelSet {
    pub status: &'static [&'static str],
    pub amounts: &'static [&'static str],
    pub planned_end: &'static [&'static str],
    pub workflow_name: &'static [&'static str],
}

impl Language {
    pub fn labels(self) -> LabelSet {
        match self {
            Language::En => LabelSet {
                status: &["Status"],
                amounts: &["Amounts", "Amount"],
                planned_end: &["Planned end", "Planned End"],
                workflow_name: &["Workflow name", "Workflow Name"],
            },
            Language::De => LabelSet {
                status: &["Status"],
                amounts: &["Betrag", "Menge"],
                planned_end: &["Geplantes Ende"],
                workflow_name: &["Workflow-Name", "Arbeitsablaufname"],
            },
            Language::Ja => LabelSet {
                status: &["ステータス"],
                amounts: &["単語数", "金額"],
                planned_end: &["予定終了日"],
                workflow_name: &["ワークフロー名"],
            },
            Language::Th => LabelSet {
                status: &["สถานะ"],
                amounts: &["จำนวนคำ"],
                planned_end: &["วันที่สิ้นสุดตามแผน"],
                workflow_name: &["ชื่อเวิร์กโฟลว์"],
            },
        }
    }
}

/// Detect the language of a message, in priority order: an explicit
/// `Content-Language` header, the HTML document's `lang` attribute, a
/// character-range heuristic over the raw text, then English.
pub fn detect_language(content_language: Option<&str>, html: Option<&str>, raw_text: &str) -> Language {
    if let Some(header) = content_language {
        if let Some(lang) = from_prefix(header) {
            return lang;
        }
    }

    if let Some(html) = html {
        if let Some(lang) = from_html_lang_attribute(html) {
            return lang;
        }
    }

    from_char_ranges(raw_text).unwrap_or(Language::En)
}

fn from_prefix(tag: &str) -> Option<Language> {
    let prefix = tag.trim().get(0..2)?.to_lowercase();
    match prefix.as_str() {
        "en" => Some(Language::En),
        "de" => Some(Language::De),
        "ja" => Some(Language::Ja),
        "th" => Some(Language::Th),
        _ => None,
    }
}

fn from_html_lang_attribute(html: &str) -> Option<Language> {
    let document = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse("html[lang]").ok()?;
    let element = document.select(&selector).next()?;
    let lang = element.value().attr("lang")?;
    from_prefix(lang)
}

fn from_char_ranges(raw_text: &str) -> Option<Language> {
    for ch in raw_text.chars() {
        let code = ch as u32;
        if (0x0E00..=0x0E7F).contains(&code) {
            return Some(Language::Th);
        }
        if (0x3000..=0x9FFF).contains(&code) {
            return Some(Language::Ja);
        }
        if matches!(ch, 'Ä' | 'Ö' | 'Ü' | 'ä' | 'ö' | 'ü' | 'ß') {
            return Some(Language::De);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_prefix_wins_over_everything() {
        let lang = detect_language(Some("de-DE"), Some("<html lang=\"en\">"), "nothing special");
        assert_eq!(lang, Language::De);
    }

    #[test]
    fn html_lang_attribute_used_when_no_header() {
        let lang = detect_language(None, Some("<html lang=\"ja\"><body>hi</body></html>"), "hi");
        assert_eq!(lang, Language::Ja);
    }

    #[test]
    fn char_range_heuristic_detects_thai() {
        let lang = detect_language(None, None, "คำสั่งงานใหม่");
        assert_eq!(lang, Language::Th);
    }

    #[test]
    fn defaults_to_english() {
        let lang = detect_language(None, None, "plain ascii body");
        assert_eq!(lang, Language::En);
    }
}
