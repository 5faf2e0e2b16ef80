//! Deterministic prompt assembly
//!
//! Pure string construction: preamble, question, grammar notes, postamble,
//! fenced context block, optional platform postamble, and the trailing
//! answer marker. Identical inputs always produce byte-identical output.

use crate::types::GrammarEntry;

/// Assemble the final prompt text sent to the model
///
/// Grammar entries missing a word or synonyms contribute nothing; this is
/// silently skipped, not an error. A non-empty platform postamble is
/// followed by two newlines before the answer marker.
pub fn compile(
    preamble: &str,
    prompt: &str,
    postamble: &str,
    grammar: &[GrammarEntry],
    context: &str,
    platform_postamble: &str,
) -> String {
    let mut out = format!("{preamble}\n\nQuestion or Instruction: {prompt}");

    if !grammar.is_empty() {
        out.push('\n');
        for entry in grammar {
            if !entry.word.is_empty() && !entry.synonyms.is_empty() {
                out.push_str(&format!(
                    "\nNote: You can consider that the word {} is same as {} \
                     in both the question and the context.",
                    entry.word,
                    entry.synonyms.join(", ")
                ));
            }
        }
    }

    let platform_postamble = if platform_postamble.is_empty() {
        String::new()
    } else {
        format!("{platform_postamble}\n\n")
    };

    out.push_str(&format!(
        "\n\n{postamble}\n\nContext:\n---------------\n{context}\n\
         -----------------\n\n{platform_postamble}Answer:"
    ));
    out
}
