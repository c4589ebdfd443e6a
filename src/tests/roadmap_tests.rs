#[cfg(test)]
mod tests {
    use bson::oid::ObjectId;
    use chrono::Utc;
    use std::sync::Arc;

    use crate::errors::AppError;
    use crate::models::roadmap::{ResourceType, Roadmap, QUESTIONS_PER_MODULE};
    use crate::services::notification_service::NotificationService;
    use crate::services::roadmap_builder::{parse_evaluation, RoadmapBuilder};
    use crate::services::roadmap_service::RoadmapService;
    use crate::services::user_service::UserService;

    use super::super::common::{evaluation_reply, fake_clients, setup, FakeLanguageModel, FakeSearch};

    #[tokio::test]
    async fn synthesized_modules_are_fully_enriched() {
        let llm = Arc::new(FakeLanguageModel::with_modules(6));
        let builder = RoadmapBuilder::new(&fake_clients(llm.clone(), FakeSearch::hits()));

        let modules = builder.synthesize("I want to learn Rust").await.unwrap();

        assert_eq!(modules.len(), 6);
        // One outline call plus one assessment per module.
        assert_eq!(llm.calls(), 7);
        for module in &modules {
            assert_eq!(module.evaluation.questions().len(), QUESTIONS_PER_MODULE);
            assert_eq!(module.subtopics.len(), 3);
            for subtopic in &module.subtopics {
                assert_eq!(subtopic.resources.len(), 2);
                assert_eq!(subtopic.resources[0].kind, ResourceType::Youtube);
                assert_eq!(subtopic.resources[1].kind, ResourceType::Coursera);
                assert!(subtopic.resources.iter().all(|r| !r.completed));
            }
        }
    }

    #[tokio::test]
    async fn failed_search_leaves_a_placeholder() {
        let llm = Arc::new(FakeLanguageModel::with_modules(1));
        let builder = RoadmapBuilder::new(&fake_clients(llm, FakeSearch::failing(503)));

        let modules = builder.synthesize("Learn Go").await.unwrap();

        let resources = &modules[0].subtopics[0].resources;
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].title, "Search failed");
        assert_eq!(resources[0].url, "503");
        assert_eq!(resources[0].kind, ResourceType::Other);
    }

    #[tokio::test]
    async fn empty_outline_is_a_model_error() {
        let llm = Arc::new(FakeLanguageModel::with_modules(0));
        let builder = RoadmapBuilder::new(&fake_clients(llm, FakeSearch::hits()));

        let err = builder.synthesize("Learn nothing").await.unwrap_err();
        assert!(matches!(err, AppError::ModelOutput(_)));
    }

    #[test]
    fn evaluation_keys_are_ordered_and_counted() {
        let evaluation = parse_evaluation(&evaluation_reply()).unwrap();
        let titles: Vec<&str> = evaluation.questions().iter().map(|q| q.question.as_str()).collect();
        assert_eq!(titles, ["Q1?", "Q2?", "Q3?", "Q4?", "Q5?"]);

        let four = r#"{"question1": {"question": "Q1?", "option A": "a", "option B": "b",
            "option C": "c", "option D": "d", "correct option": "A"}}"#;
        assert!(matches!(parse_evaluation(four), Err(AppError::ModelOutput(_))));
    }

    #[tokio::test]
    async fn revision_rewrites_content_but_not_identity() {
        let seed = Arc::new(FakeLanguageModel::with_modules(2));
        let builder = RoadmapBuilder::new(&fake_clients(seed, FakeSearch::hits()));
        let modules = builder.synthesize("Learn Rust").await.unwrap();

        let mut current = Roadmap::new(ObjectId::new(), Some(ObjectId::new()), "Learn Rust".to_string(), modules, Utc::now());
        current.id = Some(ObjectId::new());

        let mut draft = current.draft();
        draft.modules.truncate(1);
        draft.modules[0].title = "Ownership first".to_string();
        let reply = format!("```json\n{}\n```", serde_json::to_string(&draft).unwrap());

        let llm = Arc::new(FakeLanguageModel { revision: Some(reply), ..FakeLanguageModel::with_modules(2) });
        let builder = RoadmapBuilder::new(&fake_clients(llm.clone(), FakeSearch::hits()));
        let draft = builder.revise(&current, "Start with ownership").await.unwrap();
        let revised = current.revised(draft, Utc::now());

        assert_eq!(revised.id, current.id);
        assert_eq!(revised.mentor_id, current.mentor_id);
        assert_eq!(revised.created_at, current.created_at);
        assert!(revised.updated_at > current.updated_at);
        assert_eq!(revised.modules.len(), 1);
        assert_eq!(revised.modules[0].title, "Ownership first");

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Start with ownership"));
        assert!(!prompts[0].contains("\"_id\""));
    }

    #[tokio::test]
    #[ignore = "needs MONGODB_TEST_URI"]
    async fn revision_over_a_newer_best_score_conflicts() {
        let ctx = setup().await;
        let seed = RoadmapBuilder::new(&fake_clients(Arc::new(FakeLanguageModel::with_modules(1)), FakeSearch::hits()));
        let modules = seed.synthesize("Learn Rust").await.unwrap();

        let mentee = ObjectId::new();
        let mut roadmap = Roadmap::new(mentee, None, "Learn Rust".to_string(), modules, Utc::now());
        roadmap.modules[0].assessment_scores.insert(mentee.to_hex(), 60);
        let collection = ctx.db.collection::<Roadmap>("roadmaps");
        let id = collection.insert_one(&roadmap).await.unwrap().inserted_id.as_object_id().unwrap();
        roadmap.id = Some(id);

        let reply = format!("```json\n{}\n```", serde_json::to_string(&roadmap.draft()).unwrap());
        let llm = Arc::new(FakeLanguageModel { revision: Some(reply), ..FakeLanguageModel::with_modules(1) });
        let notifications = Arc::new(NotificationService::new(ctx.db.clone()));
        let users = Arc::new(UserService::new(ctx.db.clone(), notifications.clone()));
        let service = RoadmapService::new(
            ctx.db.clone(),
            users,
            notifications,
            RoadmapBuilder::new(&fake_clients(llm, FakeSearch::hits())),
        );

        // A submission lands after the revision read the document.
        let stale = service.get(id).await.unwrap();
        assert_eq!(service.record_best_score(id, 0, &mentee.to_hex(), 90).await.unwrap(), 90);

        let err = service.revise(stale, "Add more exercises").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = service.get(id).await.unwrap();
        assert_eq!(stored.modules[0].assessment_scores[&mentee.to_hex()], 90);
        assert_eq!(stored.version, roadmap.version + 1);
    }
}
