#[cfg(test)]
mod tests {
    use bson::oid::ObjectId;
    use chrono::Utc;

    use crate::errors::AppError;
    use crate::models::roadmap::{Module, Roadmap};
    use crate::services::assessment_service::{grade, PASS_MARK};
    use crate::services::roadmap_builder::parse_evaluation;

    use super::super::common::evaluation_reply;

    fn answers(letters: &[&str]) -> Vec<String> {
        letters.iter().map(|l| l.to_string()).collect()
    }

    fn module() -> Module {
        let evaluation = parse_evaluation(&evaluation_reply()).unwrap();
        Module::new("Ownership".to_string(), String::new(), vec![], evaluation)
    }

    #[test]
    fn wrong_answer_count_is_rejected() {
        let m = module();
        let err = grade(&m.evaluation, &answers(&["B", "B", "B"])).unwrap_err();
        match err {
            AppError::BadRequest(message) => assert_eq!(message, "Expected 5 answers, got 3"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(grade(&m.evaluation, &answers(&["B"; 6])).is_err());
    }

    #[test]
    fn score_is_a_rounded_percentage() {
        let m = module();
        let all = grade(&m.evaluation, &answers(&["B", "b", "option B", "B)", "B"])).unwrap();
        assert_eq!(all.score, 100);
        assert_eq!(all.correct_count, 5);
        assert!(all.passed);

        let three = grade(&m.evaluation, &answers(&["B", "B", "B", "A", "C"])).unwrap();
        assert_eq!(three.score, 60);
        assert!(!three.passed);

        let four = grade(&m.evaluation, &answers(&["B", "B", "B", "B", "D"])).unwrap();
        assert_eq!(four.score, PASS_MARK);
        assert!(four.passed);
    }

    #[test]
    fn unreadable_answers_count_as_wrong() {
        let m = module();
        let result = grade(&m.evaluation, &answers(&["B", "", "maybe", "E", "B"])).unwrap();
        assert_eq!(result.correct_count, 2);
        assert_eq!(result.score, 40);
    }

    #[test]
    fn best_score_survives_revision() {
        let mentee = ObjectId::new();
        let mut roadmap = Roadmap::new(mentee, None, "Learn Rust".to_string(), vec![module()], Utc::now());
        roadmap.modules[0].assessment_scores.insert(mentee.to_hex(), 100);

        let mut draft = roadmap.draft();
        draft.modules[0].assessment_scores.clear();
        let revised = roadmap.revised(draft, Utc::now());

        assert_eq!(revised.modules[0].assessment_scores.get(&mentee.to_hex()), Some(&100));
    }
}
