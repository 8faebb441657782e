use super::PetCare;
use crate::error::Result;
use crate::store::Action;
use crate::types::{Schedule, ScheduleDraft};

impl PetCare {
    pub async fn fetch_schedules(&self) -> Result<Vec<Schedule>> {
        self.store.dispatch(Action::SchedulesRequest).await;
        match self.api.schedules().await {
            Ok(schedules) => {
                self.store
                    .dispatch(Action::SchedulesLoaded(schedules.clone()))
                    .await;
                Ok(schedules)
            }
            Err(e) => {
                self.fail(e, "Failed to fetch schedules", Action::SchedulesFailure)
                    .await
            }
        }
    }

    pub async fn create_schedule(&self, draft: &ScheduleDraft) -> Result<Schedule> {
        self.store.dispatch(Action::SchedulesRequest).await;
        match self.api.create_schedule(draft).await {
            Ok(schedule) => {
                self.store
                    .dispatch(Action::ScheduleCreated(schedule.clone()))
                    .await;
                Ok(schedule)
            }
            Err(e) => {
                self.fail(e, "Failed to create schedule", Action::SchedulesFailure)
                    .await
            }
        }
    }

    pub async fn update_schedule(&self, id: &str, draft: &ScheduleDraft) -> Result<Schedule> {
        self.store.dispatch(Action::SchedulesRequest).await;
        match self.api.update_schedule(id, draft).await {
            Ok(schedule) => {
                self.store
                    .dispatch(Action::ScheduleUpdated(schedule.clone()))
                    .await;
                Ok(schedule)
            }
            Err(e) => {
                self.fail(e, "Failed to update schedule", Action::SchedulesFailure)
                    .await
            }
        }
    }

    pub async fn delete_schedule(&self, id: &str) -> Result<()> {
        self.store.dispatch(Action::SchedulesRequest).await;
        match self.api.delete_schedule(id).await {
            Ok(()) => {
                self.store
                    .dispatch(Action::ScheduleDeleted(id.to_string()))
                    .await;
                Ok(())
            }
            Err(e) => {
                self.fail(e, "Failed to delete schedule", Action::SchedulesFailure)
                    .await
            }
        }
    }

    /// Enable or disable a schedule; the store keeps the server's copy
    pub async fn toggle_schedule(&self, id: &str, enabled: bool) -> Result<Schedule> {
        self.store.dispatch(Action::SchedulesRequest).await;
        match self.api.toggle_schedule(id, enabled).await {
            Ok(schedule) => {
                self.store
                    .dispatch(Action::ScheduleUpdated(schedule.clone()))
                    .await;
                Ok(schedule)
            }
            Err(e) => {
                self.fail(e, "Failed to toggle schedule", Action::SchedulesFailure)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::actions::test_support::{petcare, response};
    use crate::http::{Method, MockHttpClient};
    use crate::types::ScheduleDraft;

    const LIST: &str = r#"{"data":[
        {"_id":"s1","type":"food","time":"08:00","days":["Monday","Friday"],"amount":40,"enabled":true},
        {"_id":"s2","type":"water","time":"18:30","days":["Sunday"],"amount":70,"enabled":true}
    ]}"#;

    #[tokio::test]
    async fn toggle_replaces_schedule_with_server_copy() {
        let mut http = MockHttpClient::new();
        http.expect_send()
            .withf(|req| req.method == Method::Get)
            .times(1)
            .returning(|_| Box::pin(async { Ok(response(200, LIST)) }));
        http.expect_send()
            .withf(|req| {
                req.method == Method::Patch
                    && req.url == "http://backend/api/schedules/s2/toggle"
                    && req.body == Some(serde_json::json!({"enabled": false}))
            })
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    Ok(response(
                        200,
                        r#"{"data":{"_id":"s2","type":"water","time":"18:30","days":["Sunday"],"amount":70,"enabled":false}}"#,
                    ))
                })
            });

        let app = petcare(http, Some("t1")).await;
        app.fetch_schedules().await.unwrap();
        let toggled = app.toggle_schedule("s2", false).await.unwrap();
        assert!(!toggled.enabled);

        let schedules = app.store().snapshot().await.schedules.schedules;
        assert!(schedules[0].enabled);
        assert!(!schedules[1].enabled);
    }

    #[tokio::test]
    async fn create_failure_keeps_existing_list() {
        let mut http = MockHttpClient::new();
        http.expect_send()
            .withf(|req| req.method == Method::Get)
            .returning(|_| Box::pin(async { Ok(response(200, LIST)) }));
        http.expect_send()
            .withf(|req| req.method == Method::Post)
            .returning(|_| {
                Box::pin(async { Ok(response(422, r#"{"message":"Time is required"}"#)) })
            });

        let app = petcare(http, Some("t1")).await;
        app.fetch_schedules().await.unwrap();
        assert!(app.create_schedule(&ScheduleDraft::default()).await.is_err());

        let state = app.store().snapshot().await.schedules;
        assert_eq!(state.schedules.len(), 2);
        assert_eq!(state.error.as_deref(), Some("Time is required"));
    }

    #[tokio::test]
    async fn delete_removes_from_store() {
        let mut http = MockHttpClient::new();
        http.expect_send()
            .withf(|req| req.method == Method::Get)
            .returning(|_| Box::pin(async { Ok(response(200, LIST)) }));
        http.expect_send()
            .withf(|req| req.method == Method::Delete && req.url.ends_with("/schedules/s1"))
            .times(1)
            .returning(|_| Box::pin(async { Ok(response(200, r#"{"success":true}"#)) }));

        let app = petcare(http, Some("t1")).await;
        app.fetch_schedules().await.unwrap();
        app.delete_schedule("s1").await.unwrap();
        let ids: Vec<_> = app
            .store()
            .snapshot()
            .await
            .schedules
            .schedules
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["s2".to_string()]);
    }
}
