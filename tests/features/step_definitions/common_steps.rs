//! Common step definitions used across features

use cucumber::{given, then};

use crate::common::{create_active_employee, ADMIN_EMAIL, HR_EMAIL, PASSWORD};
use crate::features::support::TestWorld;

#[given("a seeded onboarding service")]
async fn seeded_service(world: &mut TestWorld) {
    world.start().await;
}

#[given("I am logged in as admin")]
async fn logged_in_as_admin(world: &mut TestWorld) {
    world.log_in(ADMIN_EMAIL, PASSWORD).await;
}

#[given("I am logged in as HR")]
async fn logged_in_as_hr(world: &mut TestWorld) {
    world.log_in(HR_EMAIL, PASSWORD).await;
}

#[given(expr = "I am logged in as {string}")]
async fn logged_in_as(world: &mut TestWorld, email: String) {
    world.log_in(&email, PASSWORD).await;
}

#[given(expr = "an active employee {string}")]
async fn active_employee(world: &mut TestWorld, email: String) {
    create_active_employee(&world.app().state, &email).await;
}

#[then(expr = "the response status should be {int}")]
async fn response_status(world: &mut TestWorld, status: u16) {
    world.response().assert_status(
        axum::http::StatusCode::from_u16(status).expect("valid status code"),
    );
}

#[then(expr = "the error message should be {string}")]
async fn error_message(world: &mut TestWorld, message: String) {
    assert_eq!(world.response().error_message(), message);
}
