//! One-shot prediction from the command line.

use danbot_core::{Mode, Prediction, Vocabulary};

use crate::cli::{GlobalArgs, PredictArgs, effective_config};
use crate::services::loader;

pub async fn execute(global: GlobalArgs, args: PredictArgs) -> anyhow::Result<()> {
    let cfg = effective_config(&global, &args.pipeline)?;
    let predictor = tokio::task::spawn_blocking(move || loader::load_predictor(&cfg)).await??;

    let text = args.text.clone();
    let (predictor, prediction) = tokio::task::spawn_blocking(move || {
        let prediction = predictor.predict(&text);
        (predictor, prediction)
    })
    .await?;
    let prediction = prediction?;

    if args.json {
        let finish = prediction.finish_reason;
        println!("{}", serde_json::to_string(&predictor.payload(prediction))?);
        if let Some(reason) = finish {
            eprintln!("finish_reason: {reason}");
        }
        return Ok(());
    }

    print!("{}", summarize(predictor.vocab(), predictor.mode(), &prediction, args.top_k));
    Ok(())
}

/// Human-readable view: per-step top-k candidates and the argmax tags,
/// with special tokens hidden.
pub fn summarize(vocab: &Vocabulary, mode: Mode, prediction: &Prediction, k: usize) -> String {
    let label = match mode {
        Mode::Generative => "p",
        Mode::SinglePass => "score",
    };

    let mut out = String::new();
    let mut tags = Vec::new();
    for (step, row) in prediction.logits.iter().enumerate() {
        let candidates: Vec<String> = top_k(row, k)
            .into_iter()
            .map(|(id, v)| format!("{} ({label}={v:.4})", vocab.token(id).unwrap_or("<unk>")))
            .collect();
        out.push_str(&format!("step {step:>3}: {}\n", candidates.join(", ")));

        if let Some(&(best, _)) = top_k(row, 1).first()
            && let Some(token) = vocab.token(best)
            && !is_special(token)
        {
            tags.push(token);
        }
    }

    if let Some(reason) = prediction.finish_reason {
        out.push_str(&format!("finish: {reason}\n"));
    }
    out.push_str(&format!("tags: {}\n", tags.join(", ")));
    out
}

/// Highest `k` entries, best first; ties keep the lower id. NaN is skipped.
pub fn top_k(row: &[f32], k: usize) -> Vec<(u32, f32)> {
    let mut ranked: Vec<(u32, f32)> = row
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .map(|(i, &v)| (i as u32, v))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(k);
    ranked
}

/// Control and structural markers of the decoder vocabulary. Anything else,
/// including bracketed emoticon tags, is a real tag.
pub const SPECIAL_TOKENS: &[&str] = &[
    "<|bos|>",
    "<|eos|>",
    "<|pad|>",
    "<|unk|>",
    "<general>",
    "</general>",
    "<copyright>",
    "</copyright>",
    "<character>",
    "</character>",
    "<translation>",
    "</translation>",
];

pub fn is_special(token: &str) -> bool {
    SPECIAL_TOKENS.contains(&token)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use danbot_core::FinishReason;

    use super::*;

    fn vocab() -> Vocabulary {
        let map: HashMap<String, u32> = ["<|bos|>", "</translation>", "cat", "black"]
            .iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i as u32))
            .collect();
        Vocabulary::new(map, 4).unwrap()
    }

    #[test]
    fn top_k_orders_and_breaks_ties_low() {
        let row = [0.1, 0.4, f32::NAN, 0.4, 0.1];
        assert_eq!(top_k(&row, 3), vec![(1, 0.4), (3, 0.4), (0, 0.1)]);
        assert_eq!(top_k(&row, 10).len(), 4);
        assert!(top_k(&row, 0).is_empty());
    }

    #[test]
    fn special_tokens() {
        assert!(is_special("<|bos|>"));
        assert!(is_special("</translation>"));
        assert!(!is_special("1girl"));
        assert!(is_special("<character>"));
        assert!(!is_special("<o>_<o>"));
        assert!(!is_special("<|aspect_ratio:tall|>"));
        assert!(!is_special(">_<"));
    }

    #[test]
    fn summary_keeps_bracketed_tags() {
        let map: HashMap<String, u32> = ["</translation>", "<o>_<o>", "cat"]
            .iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i as u32))
            .collect();
        let vocab = Vocabulary::new(map, 3).unwrap();
        let prediction = Prediction {
            logits: vec![
                vec![0.1, 0.8, 0.1],
                vec![0.1, 0.1, 0.8],
                vec![0.8, 0.1, 0.1],
            ],
            tokens: vec![1, 2, 0],
            finish_reason: Some(FinishReason::Stop),
        };
        let text = summarize(&vocab, Mode::Generative, &prediction, 1);
        assert!(text.ends_with("tags: <o>_<o>, cat\n"), "{text}");
    }

    #[test]
    fn summary_hides_markers() {
        let prediction = Prediction {
            logits: vec![
                vec![0.05, 0.05, 0.1, 0.8],
                vec![0.05, 0.05, 0.8, 0.1],
                vec![0.0, 1.0, 0.0, 0.0],
            ],
            tokens: vec![3, 2, 1],
            finish_reason: Some(FinishReason::Stop),
        };
        let text = summarize(&vocab(), Mode::Generative, &prediction, 2);
        assert!(text.contains("step   0: black (p=0.8000), cat (p=0.1000)"), "{text}");
        assert!(text.contains("finish: stop"));
        assert!(text.ends_with("tags: black, cat\n"));
    }
}
