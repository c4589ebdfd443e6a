#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::errors::AppError;
    use crate::services::interview_service::{
        next_question, plan, question_count, record_answer, render_history, Exchange, Interviewer, NextStep, CLOSING,
        GREETING,
    };

    use super::super::common::{fake_clients, FailingSpeech, FakeLanguageModel, FakeSearch};

    fn interviewer(llm: Arc<FakeLanguageModel>) -> Interviewer {
        Interviewer::new(fake_clients(llm, FakeSearch::hits()), std::env::temp_dir())
    }

    fn open_question(mut history: Vec<Exchange>, question: &str) -> Vec<Exchange> {
        history.push(Exchange { question: question.to_string(), answer: None });
        history
    }

    fn answered(n: usize) -> Vec<Exchange> {
        (1..=n)
            .map(|i| Exchange { question: format!("Question {i}"), answer: Some(format!("Answer {i}")) })
            .collect()
    }

    #[tokio::test]
    async fn empty_history_gets_the_greeting_without_the_model() {
        let llm = FakeLanguageModel::default();
        let (question, finished) = next_question(&llm, &[], "Ask about traits", "Rust").await.unwrap();
        assert_eq!(question, GREETING);
        assert!(!finished);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn five_questions_close_the_interview() {
        let llm = FakeLanguageModel::default();
        let (question, finished) = next_question(&llm, &answered(5), "Ask about traits", "Rust").await.unwrap();
        assert_eq!(question, CLOSING);
        assert!(finished);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn middle_turns_ask_the_model() {
        let llm = FakeLanguageModel::default();
        let (question, finished) = next_question(&llm, &answered(2), "Ask about traits", "Rust").await.unwrap();
        assert_eq!(question, "What is ownership in Rust?");
        assert!(!finished);
        assert_eq!(llm.calls(), 1);

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Instructions: Ask about traits"));
        assert!(prompts[0].contains("Answer 2"));
    }

    #[test]
    fn each_exchange_counts_once() {
        let rendered = render_history(&answered(3));
        assert_eq!(question_count(&rendered), 3);
        assert!(matches!(plan(&answered(4), "x", "y"), NextStep::Ask(_)));
        assert_eq!(plan(&answered(6), "x", "y"), NextStep::Closing);
    }

    #[test]
    fn transcripts_fill_the_open_question() {
        let mut history = Vec::new();
        record_answer(&mut history, "Hi, I am a mentee");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, GREETING);

        history.push(Exchange { question: "Why Rust?".to_string(), answer: None });
        record_answer(&mut history, "Speed");
        assert_eq!(history[1].answer.as_deref(), Some("Speed"));

        record_answer(&mut history, "and safety");
        assert_eq!(history[1].answer.as_deref(), Some("Speed and safety"));
    }

    #[tokio::test]
    async fn transcript_reaches_the_next_prompt() {
        let llm = Arc::new(FakeLanguageModel::default());
        let history = open_question(answered(2), "Why Rust?");

        let turn = interviewer(llm.clone())
            .respond(history, Some(vec![1, 2, 3]), "Ask about traits", "Rust")
            .await
            .unwrap();

        assert_eq!(turn.transcript.as_deref(), Some("I am learning Rust"));
        assert_eq!(turn.next_question, "What is ownership in Rust?");
        assert!(!turn.finished);
        assert_eq!(turn.audio_path, None);
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Why Rust?"));
        assert!(prompts[0].contains("I am learning Rust"));
    }

    #[tokio::test]
    async fn failed_transcription_ends_the_turn() {
        let llm = Arc::new(FakeLanguageModel::default());
        let mut clients = fake_clients(llm.clone(), FakeSearch::hits());
        clients.stt = Arc::new(FailingSpeech);
        let interviewer = Interviewer::new(clients, std::env::temp_dir());

        let err = interviewer
            .respond(open_question(answered(1), "Why Rust?"), Some(vec![1]), "Ask about traits", "Rust")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Speech(_)));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn answering_the_fifth_question_finishes() {
        let llm = Arc::new(FakeLanguageModel::default());
        let history = open_question(answered(4), "Question 5");

        let turn = interviewer(llm.clone())
            .respond(history, Some(vec![1]), "Ask about traits", "Rust")
            .await
            .unwrap();

        assert!(turn.finished);
        assert_eq!(turn.next_question, CLOSING);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn missing_audio_still_gets_a_question() {
        let llm = Arc::new(FakeLanguageModel::default());
        let turn = interviewer(llm).respond(vec![], None, "Ask about traits", "Rust").await.unwrap();
        assert_eq!(turn.transcript, None);
        assert_eq!(turn.next_question, GREETING);
        assert_eq!(turn.audio_path, None);
    }
}
