//! Test world for Cucumber scenarios

use std::collections::HashMap;
use std::fmt;

use cucumber::World;

use hr_onboarding::db::{employee_repository::EmployeeDetails, EmployeeRepository, UserRepository};

use crate::common::{seeded_app, Session, TestApp, TestResponse};

/// State shared by the steps of one scenario
#[derive(Default, World)]
pub struct TestWorld {
    /// Application under test, built by the background step
    pub app: Option<TestApp>,

    /// Session the next request is sent with
    pub session: Option<Session>,

    /// Sessions by email, so a scenario can switch actors
    pub sessions: HashMap<String, Session>,

    /// Response from the last API call
    pub last_response: Option<TestResponse>,
}

impl fmt::Debug for TestWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestWorld")
            .field("started", &self.app.is_some())
            .field("session", &self.session)
            .field("last_response", &self.last_response)
            .finish()
    }
}

impl TestWorld {
    pub async fn start(&mut self) {
        self.app = Some(seeded_app().await);
    }

    pub fn app(&self) -> &TestApp {
        self.app.as_ref().expect("the service was started")
    }

    pub fn response(&self) -> &TestResponse {
        self.last_response.as_ref().expect("a request was made")
    }

    pub fn current_session(&self) -> &Session {
        self.session.as_ref().expect("someone is logged in")
    }

    /// Log in and make that session the current one
    pub async fn log_in(&mut self, email: &str, password: &str) {
        let session = self.app().login(email, password).await;
        self.sessions.insert(email.to_string(), session.clone());
        self.session = Some(session);
    }

    /// The employee linked to the account with this email
    pub async fn employee(&self, email: &str) -> EmployeeDetails {
        let db = &self.app().state.db;
        let user = UserRepository::new(db)
            .find_by_email(email)
            .await
            .unwrap()
            .expect("user exists");
        EmployeeRepository::new(db)
            .find_by_user_id(user.id)
            .await
            .unwrap()
            .expect("employee exists")
    }

    pub async fn employee_number(&self, email: &str) -> String {
        self.employee(email)
            .await
            .employee
            .employee_number
            .expect("employee number assigned")
    }
}
