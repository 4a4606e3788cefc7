use docqa_core::types::{Answer, SearchHit};

pub const NO_RELEVANT_INFO: &str = "Apologies, I couldn't find relevant information.";

pub fn refusal(query: &str) -> String {
    format!("Sorry, we do not offer information on '{}' at this time.", query.to_lowercase())
}

/// Turns ranked hits into a response.
///
/// Only the first (most similar) hit is inspected. It is accepted when its
/// score is at or above `threshold`; the remaining hits never change the outcome.
pub fn decide(query: &str, hits: &[SearchHit], threshold: f32) -> Answer {
    let Some(top) = hits.first() else {
        return Answer { response: NO_RELEVANT_INFO.to_string(), matched: None };
    };
    if top.score >= threshold {
        Answer { response: format!("**Answer:** {}", top.chunk.content), matched: Some(top.chunk.clone()) }
    } else {
        Answer { response: refusal(query), matched: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::Chunk;

    fn hit(content: &str, score: f32) -> SearchHit {
        SearchHit { chunk: Chunk { content: content.into(), source_label: "faq.txt".into(), chunk_index: 0 }, score }
    }

    #[test]
    fn no_hits_is_no_relevant_information() {
        let a = decide("anything", &[], 0.6);
        assert_eq!(a.response, NO_RELEVANT_INFO);
        assert!(a.matched.is_none());
    }

    #[test]
    fn just_below_threshold_is_refused() {
        let a = decide("Opening Hours?", &[hit("We open at 9.", 0.599)], 0.6);
        assert_eq!(a.response, "Sorry, we do not offer information on 'opening hours?' at this time.");
        assert!(a.matched.is_none());
    }

    #[test]
    fn just_above_threshold_is_answered() {
        let a = decide("Opening hours?", &[hit("We open at 9.", 0.601)], 0.6);
        assert_eq!(a.response, "**Answer:** We open at 9.");
        assert_eq!(a.matched.map(|c| c.content), Some("We open at 9.".to_string()));
    }

    #[test]
    fn threshold_is_inclusive() {
        let a = decide("Opening hours?", &[hit("We open at 9.", 0.6)], 0.6);
        assert!(a.matched.is_some());
    }

    #[test]
    fn only_the_first_hit_gates() {
        let hits = [hit("weak", 0.3), hit("strong", 0.95), hit("stronger", 0.99)];
        let a = decide("q", &hits, 0.6);
        assert!(a.matched.is_none());

        let hits = [hit("good", 0.7), hit("bad", 0.1)];
        assert_eq!(decide("q", &hits, 0.6).response, "**Answer:** good");
    }
}
