//! Heuristic stand-ins for the generation tasks when Gemini is unavailable.
//!
//! Everything here works on the literal note text: sentences are segmented
//! on terminal punctuation, one keyword is picked per sentence, and the
//! results are shaped like the remote answers (bullets, an HTML table, a
//! 5-question quiz). None of these functions fail.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::QuizQuestion;
use crate::parse::{QUIZ_LEN, QUIZ_OPTIONS};
use crate::util::{ellipsize, escape_html};

pub const NO_CONTENT: &str = "No content provided.";
pub const TABLE_CLASS: &str = "sb-ai-table";

const MIN_SENTENCE_CHARS: usize = 25;
const SUMMARY_SENTENCES: usize = 5;
const TABLE_ROWS: usize = 4;
const KEY_POINTS_CHARS: usize = 120;
const OPTION_CHARS: usize = 140;
const KEYWORD_PLACEHOLDER: &str = "the notes";

/// Distinct fillers, so padded questions still have 4 different options.
const DECOY_FILLERS: [&str; 3] = [
  "Not mentioned in the notes.",
  "Not covered anywhere in the notes.",
  "None of the above is mentioned in the notes.",
];

const STOPWORDS: &[&str] = &[
  "the", "and", "with", "from", "that", "this", "there", "their", "have", "has", "been", "were",
  "what", "when", "where", "which", "will", "would", "could", "should", "about", "into", "over",
  "under", "after", "before", "during", "while", "your", "ours", "they", "them", "then", "than",
  "also",
];

/// Segment text into sentences longer than 25 characters. Short or
/// unpunctuated input falls back to its non-empty lines.
pub fn extract_sentences(text: &str) -> Vec<String> {
  if text.is_empty() {
    return Vec::new();
  }

  let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
  let sentences: Vec<String> = split_after_terminals(&normalized)
    .into_iter()
    .map(str::trim)
    .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
    .map(str::to_string)
    .collect();
  if !sentences.is_empty() {
    return sentences;
  }

  text.split('\n')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
    .collect()
}

// Input is whitespace-normalized, so a boundary is exactly "<terminal> ".
fn split_after_terminals(s: &str) -> Vec<&str> {
  let mut out = Vec::new();
  let mut start = 0;
  let mut prev: Option<char> = None;
  for (idx, ch) in s.char_indices() {
    if ch == ' ' && matches!(prev, Some('.' | '!' | '?')) {
      out.push(&s[start..idx]);
      start = idx + 1;
    }
    prev = Some(ch);
  }
  out.push(&s[start..]);
  out
}

/// First lowercase token longer than 4 characters that is not a stopword.
pub fn pick_keyword(sentence: &str) -> Option<String> {
  let cleaned: String = sentence
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c.is_whitespace() { c } else { ' ' })
    .collect();
  cleaned
    .split_whitespace()
    .map(str::to_lowercase)
    .find(|w| w.len() > 4 && !STOPWORDS.contains(&w.as_str()))
}

pub fn summary(text: &str) -> String {
  let sentences = extract_sentences(text);
  if sentences.is_empty() {
    return NO_CONTENT.to_string();
  }
  sentences
    .iter()
    .take(SUMMARY_SENTENCES)
    .map(|s| format!("• {}", s))
    .collect::<Vec<_>>()
    .join("\n")
}

pub fn table(text: &str) -> String {
  let mut rows: Vec<String> = extract_sentences(text).into_iter().take(TABLE_ROWS).collect();
  if rows.is_empty() {
    rows.push(NO_CONTENT.to_string());
  }

  let body: String = rows
    .iter()
    .enumerate()
    .map(|(idx, s)| {
      // First three space-separated tokens, empty ones included.
      let topic = s.split(' ').take(3).collect::<Vec<_>>().join(" ");
      let topic = if topic.is_empty() { format!("Topic {}", idx + 1) } else { topic };
      format!(
        "<tr><td>{}</td><td>{}</td><td>See notes</td></tr>",
        escape_html(&topic),
        escape_html(&ellipsize(s, KEY_POINTS_CHARS)),
      )
    })
    .collect();

  format!(
    "<table class=\"{}\"><thead><tr><th>Topic</th><th>Key Points</th><th>Example</th></tr></thead><tbody>{}</tbody></table>",
    TABLE_CLASS, body
  )
}

/// Five keyword questions built from the note's own sentences. The option
/// order comes from `rng`; the correct answer always appears verbatim.
pub fn quiz<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Vec<QuizQuestion> {
  let sentences = extract_sentences(text);
  if sentences.is_empty() {
    return unavailable_quiz();
  }

  (0..QUIZ_LEN)
    .map(|i| {
      let sentence = &sentences[i % sentences.len()];
      let keyword = pick_keyword(sentence).unwrap_or_else(|| KEYWORD_PLACEHOLDER.to_string());
      let correct = ellipsize(sentence, OPTION_CHARS);

      let mut options = vec![correct.clone()];
      for s in &sentences {
        if options.len() == QUIZ_OPTIONS {
          break;
        }
        if s == sentence || s.to_lowercase().contains(&keyword) {
          continue;
        }
        let decoy = ellipsize(s, OPTION_CHARS);
        if !options.contains(&decoy) {
          options.push(decoy);
        }
      }
      for filler in DECOY_FILLERS {
        if options.len() == QUIZ_OPTIONS {
          break;
        }
        if !options.iter().any(|o| o == filler) {
          options.push(filler.to_string());
        }
      }
      let mut n = 2;
      while options.len() < QUIZ_OPTIONS {
        let filler = format!("Not mentioned in the notes ({}).", n);
        if !options.contains(&filler) {
          options.push(filler);
        }
        n += 1;
      }
      options.shuffle(rng);

      QuizQuestion {
        id: (i + 1) as u32,
        question: format!("Which statement in your notes is associated with \"{}\"?", keyword),
        options,
        correct_answer: correct,
      }
    })
    .collect()
}

/// Informational quiz for notes that yield nothing to ask about.
pub fn unavailable_quiz() -> Vec<QuizQuestion> {
  (1..=QUIZ_LEN as u32)
    .map(|id| QuizQuestion {
      id,
      question: "Real AI is currently unavailable and the notes had no usable content.".into(),
      options: vec!["Check API Key".into(), "Retry".into(), "Use Offline Mode".into(), "Help".into()],
      correct_answer: "Check API Key".into(),
    })
    .collect()
}

/// Labelled identity rewrite; no style transformation happens offline.
pub fn rewrite(text: &str, style: Option<&str>) -> String {
  if text.is_empty() {
    return NO_CONTENT.to_string();
  }
  match style {
    Some(style) if !style.is_empty() => format!("Rewrite ({}):\n{}", style, text),
    _ => format!("Rewrite:\n{}", text),
  }
}
