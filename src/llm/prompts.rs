use crate::align::format_clock;
use crate::models::Transcript;

pub const CLASSIFIER_SYSTEM_PROMPT: &str = "You are analyzing a transcript from an Islamic educational class video. You identify and segment the video into distinct sections and report them through the submit_sections tool.";

/// Build the classification request for one transcript.
///
/// Each span is rendered as a `[MM:SS] text` line so the model can anchor
/// its section boundaries to real timestamps.
pub fn build_classifier_prompt(transcript: &Transcript) -> String {
    let mut rendered = String::new();
    for span in &transcript.spans {
        rendered.push('[');
        rendered.push_str(&format_clock(span.start_seconds));
        rendered.push_str("] ");
        rendered.push_str(&span.text);
        rendered.push('\n');
    }

    format!(
        r#"Your task is to identify and segment the video into 5 distinct sections. These sections may appear in ANY order.

The 5 sections are:
1. **Salam Time/Ice Breaker** - Greetings, introductions, casual conversation, attendance, how are you doing
2. **Discussion Topic** - Main lesson content, teaching, Q&A about the topic
3. **Quran Recitation** - Reading, reciting, or studying Quranic verses
4. **Arabic** - Arabic language learning, vocabulary, grammar lessons
5. **Worship** - Prayer time, dua, spiritual practices

**Important Notes:**
- Sections can appear in ANY order (not necessarily 1-5)
- Some sections might be brief or missing entirely
- Look for natural transitions and topic changes
- Use the timestamps to identify section boundaries
- Only include sections that are actually present in the video

Here is the transcript with timestamps:

{rendered}

Analyze this transcript and identify which parts belong to which sections. For each section you identify, determine the start and end timestamps, write a brief summary, and assign it to one of the 5 categories. Then submit your analysis with the submit_sections tool."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TranscriptSpan;

    #[test]
    fn test_prompt_renders_timestamped_lines() {
        let (transcript, _) = Transcript::from_spans(vec![
            TranscriptSpan {
                start_seconds: 0.0,
                end_seconds: 150.0,
                text: "Welcome everyone".to_string(),
            },
            TranscriptSpan {
                start_seconds: 150.0,
                end_seconds: 300.0,
                text: "Let us begin".to_string(),
            },
        ]);

        let prompt = build_classifier_prompt(&transcript);

        assert!(prompt.contains("[00:00] Welcome everyone"));
        assert!(prompt.contains("[02:30] Let us begin"));
        assert!(prompt.contains("Salam Time/Ice Breaker"));
    }
}
