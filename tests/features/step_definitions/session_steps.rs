//! Session cookie steps

use cucumber::{then, when};

use crate::features::support::TestWorld;

#[when("I refresh the session")]
async fn refresh(world: &mut TestWorld) {
    let refresh = world.current_session().refresh.clone();
    let response = world
        .app()
        .post_with_cookie("/api/v1/auth/refresh", &format!("refresh={}", refresh), None)
        .await;
    world.last_response = Some(response);
}

#[when("I log out")]
async fn log_out(world: &mut TestWorld) {
    let response = world
        .app()
        .post_as(
            "/api/v1/auth/logout",
            serde_json::json!({}),
            world.current_session(),
        )
        .await;
    world.last_response = Some(response);
}

#[then("a new access cookie should be set")]
async fn new_access_cookie(world: &mut TestWorld) {
    let response = world.response();
    let cookie = response.cookie("access").expect("access cookie set");
    assert!(!cookie.value().is_empty());
    assert!(response.cookie("refresh").is_none());
}

#[then("the session cookies should be cleared")]
async fn cookies_cleared(world: &mut TestWorld) {
    let response = world.response();
    for name in ["access", "refresh"] {
        let cookie = response
            .cookie(name)
            .unwrap_or_else(|| panic!("{} cookie not cleared", name));
        assert_eq!(cookie.value(), "");
    }
}
