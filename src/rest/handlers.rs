use std::str::FromStr;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use minijinja::context;
use serde::Serialize;

use super::{
    form::FormData,
    models::{DashboardQuery, ErrorResponse, HealthResponse, SuccessResponse},
    session::{clear_cookie, read_flashes, redirect_with_flash, with_cookies, CurrentUser, FLASH_COOKIE},
    AppState,
};
use crate::{
    auth::password::MIN_PASSWORD_LEN,
    storage::Storage,
    types::{
        exercise,
        plan::{DEFAULT_REPS, DEFAULT_SETS, DEFAULT_WEIGHT},
        CompletedExercise, FitnessError, FitnessLevel, PlanFilter, PlannedExercise, User,
    },
    workouts,
};

/// Client scripts compiled into the binary, served under `/static/`.
const STATIC_ASSETS: &[(&str, &str)] = &[
    ("workout.js", include_str!("../../static/workout.js")),
    ("timer.js", include_str!("../../static/timer.js")),
    ("progress.js", include_str!("../../static/progress.js")),
];

pub(super) fn internal_error(what: &str, err: anyhow::Error) -> Response {
    log::error!("{}: {:?}", what, err);
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// Renders a page with the shared layout context and consumes pending flashes.
fn try_render_page<S: Storage, T: Serialize>(
    state: &AppState<S>,
    headers: &HeaderMap,
    name: &str,
    user: Option<&User>,
    page: T,
) -> anyhow::Result<Response> {
    let flashes = read_flashes(headers);
    let user = user.map(|u| context! { username => &u.username, email => &u.email });
    let html = state.templates.render(
        name,
        context! {
            user => user,
            flashes => &flashes,
            page => page,
        },
    )?;
    Ok(if flashes.is_empty() {
        html.into_response()
    } else {
        with_cookies(html.into_response(), &[clear_cookie(FLASH_COOKIE)])
    })
}

pub(super) fn render_page<S: Storage, T: Serialize>(
    state: &AppState<S>,
    headers: &HeaderMap,
    name: &str,
    user: Option<&User>,
    page: T,
) -> Response {
    try_render_page(state, headers, name, user, page)
        .unwrap_or_else(|err| internal_error(&format!("Failed to render {name}"), err))
}

// JSON embedded in a <script> block must not close it early.
fn script_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/")
}

pub async fn health<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
) -> impl IntoResponse {
    let uptime_secs = state.started_at.elapsed().map(|d| d.as_secs()).unwrap_or(0);
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            uptime_secs,
        }),
    )
}

pub async fn static_asset(Path(file): Path<String>) -> Response {
    match STATIC_ASSETS.iter().find(|(name, _)| *name == file) {
        Some((_, body)) => (
            [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
            *body,
        )
            .into_response(),
        None => not_found().await.into_response(),
    }
}

pub async fn index<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    current: Option<CurrentUser>,
) -> Response {
    render_page(
        &state,
        &headers,
        "index.html",
        current.as_ref().map(|c| &c.user),
        context! {
            google_enabled => state.google.is_some(),
            min_password_len => MIN_PASSWORD_LEN,
        },
    )
}

pub async fn dashboard<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    current: CurrentUser,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let level = match query.level.as_deref().filter(|l| !l.is_empty()) {
        Some(raw) => match FitnessLevel::from_str(raw) {
            Ok(level) => Some(level),
            Err(err) => {
                log::warn!("Ignoring dashboard filter: {}", err);
                None
            }
        },
        None => None,
    };
    let filter = PlanFilter { level };

    let dash = match workouts::dashboard(&state.storage, &current.user.id, &filter, Utc::now()) {
        Ok(dash) => dash,
        Err(err) => return internal_error("Failed to load dashboard", err),
    };

    render_page(
        &state,
        &headers,
        "dashboard.html",
        Some(&current.user),
        context! {
            plans => dash.plans,
            stats => dash.stats,
            recent_sessions => dash.recent_sessions,
            levels => FitnessLevel::ALL,
            level => level,
        },
    )
}

pub async fn create_plan_form<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    current: CurrentUser,
) -> Response {
    render_page(
        &state,
        &headers,
        "workout_plan.html",
        Some(&current.user),
        context! {
            exercises => exercise::library(),
            levels => FitnessLevel::ALL,
            default_sets => DEFAULT_SETS,
            default_reps => DEFAULT_REPS,
        },
    )
}

pub async fn create_plan<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    current: CurrentUser,
    body: Bytes,
) -> Response {
    let form = FormData::parse(&body);
    let name = form.get("name").unwrap_or_default();

    let level = match form.get("level").filter(|l| !l.is_empty()) {
        Some(raw) => match FitnessLevel::from_str(raw) {
            Ok(level) => level,
            Err(err) => return redirect_with_flash("/create_plan", "error", &err.to_string()),
        },
        None => FitnessLevel::Unspecified,
    };

    let exercises = form
        .get_all("exercises")
        .into_iter()
        .map(|key| {
            PlannedExercise::new(key).with_targets(
                form.get_or(&format!("sets_{key}"), DEFAULT_SETS),
                form.get_or(&format!("reps_{key}"), DEFAULT_REPS),
                form.get_weight(&format!("weight_{key}"), DEFAULT_WEIGHT),
            )
        })
        .collect();

    match workouts::create_plan(&state.storage, &current.user.id, name, exercises, level) {
        Ok(plan) => redirect_with_flash(
            "/dashboard",
            "success",
            &format!("Workout plan '{}' created successfully!", plan.name),
        ),
        Err(err) => match err.downcast_ref::<FitnessError>() {
            Some(FitnessError::EmptyPlanName) => {
                redirect_with_flash("/create_plan", "error", "Workout plan name is required.")
            }
            Some(e) => redirect_with_flash("/create_plan", "error", &e.to_string()),
            None => internal_error("Failed to save workout plan", err),
        },
    }
}

pub async fn exercise_library<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    current: CurrentUser,
) -> Response {
    render_page(
        &state,
        &headers,
        "exercise_library.html",
        Some(&current.user),
        context! { exercises => exercise::library() },
    )
}

pub async fn start_workout<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    current: CurrentUser,
    Path(plan_id): Path<String>,
) -> Response {
    let page = workouts::start_workout(
        &state.storage,
        &current.user.id,
        &plan_id,
        Utc::now(),
        |plan, session| {
            try_render_page(
                &state,
                &headers,
                "track_workout.html",
                Some(&current.user),
                context! { plan => plan, session => session },
            )
        },
    );
    match page {
        Ok(resp) => resp,
        Err(err) => match err.downcast_ref::<FitnessError>() {
            Some(FitnessError::PlanNotFound(_)) => {
                redirect_with_flash("/dashboard", "error", "Workout plan not found.")
            }
            _ => internal_error("Failed to start workout", err),
        },
    }
}

pub async fn complete_exercise<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    current: CurrentUser,
    body: Bytes,
) -> Response {
    let form = FormData::parse(&body);
    let session_id = form.get("session_id").unwrap_or_default();
    let exercise = CompletedExercise::from_set_rows(
        form.get("exercise_key").unwrap_or_default(),
        &form.get_all("sets_completed[]"),
        &form.get_all("reps_completed[]"),
        &form.get_all("weights_used[]"),
    );

    match workouts::complete_exercise(&state.storage, &current.user.id, session_id, exercise) {
        Ok(_) => Json(SuccessResponse { success: true }).into_response(),
        Err(err) => match err.downcast_ref::<FitnessError>() {
            Some(FitnessError::SessionNotFound(_)) => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "Session not found".to_string(),
                }),
            )
                .into_response(),
            _ => internal_error("Failed to record exercise", err),
        },
    }
}

pub async fn finish_workout<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    current: CurrentUser,
    body: Bytes,
) -> Response {
    let form = FormData::parse(&body);
    let session_id = form.get("session_id").unwrap_or_default();
    let notes = form.get("notes").unwrap_or_default();

    match workouts::finish_workout(
        &state.storage,
        &current.user.id,
        session_id,
        notes,
        Utc::now(),
    ) {
        Ok(_) => redirect_with_flash("/dashboard", "success", "Workout completed! Great job!"),
        Err(err) => match err.downcast_ref::<FitnessError>() {
            Some(FitnessError::SessionNotFound(_)) => {
                redirect_with_flash("/dashboard", "error", "Workout session not found.")
            }
            _ => internal_error("Failed to finish workout", err),
        },
    }
}

pub async fn progress<S: Storage + Clone + Send + Sync + 'static>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    current: CurrentUser,
) -> Response {
    let progress = match workouts::progress(&state.storage, &current.user.id) {
        Ok(progress) => progress,
        Err(err) => return internal_error("Failed to load progress", err),
    };

    render_page(
        &state,
        &headers,
        "progress.html",
        Some(&current.user),
        context! {
            monthly_json => script_json(&progress.monthly),
            exercise_json => script_json(&progress.exercises),
            monthly => progress.monthly,
            exercises => progress.exercises,
        },
    )
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "endpoint not found".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        rest::{router, session::SESSION_COOKIE},
        storage::MemoryStorage,
        types::{WorkoutPlan, WorkoutSession},
    };
    use axum::{
        body::Body,
        http::{header::COOKIE, Request},
        Router,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct Harness {
        state: AppState<MemoryStorage>,
        app: Router,
        user: User,
        cookie: String,
    }

    fn harness() -> Harness {
        let storage = MemoryStorage::new();
        let state = AppState::new(storage, None, false).unwrap();
        let user = User::new_local("ana@example.com", "Ana", "hash".into());
        state.storage.save_user(&user).unwrap();
        let token = state.sessions.login(&user.id).unwrap();
        Harness {
            app: router(state.clone()),
            state,
            user,
            cookie: format!("{SESSION_COOKIE}={token}"),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    fn form_post(uri: &str, cookie: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn location(resp: &Response) -> &str {
        resp.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    async fn body_string(resp: Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn anonymous_dashboard_redirects_home() {
        let h = harness();
        let resp = send(&h.app, get("/dashboard", "")).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
    }

    #[tokio::test]
    async fn create_plan_reads_per_exercise_targets() {
        let h = harness();
        let resp = send(
            &h.app,
            form_post(
                "/create_plan",
                &h.cookie,
                "name=Push+day&level=advanced&exercises=bench_press&exercises=push_ups\
                 &sets_bench_press=5&reps_bench_press=5&weight_bench_press=80",
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/dashboard");

        let plans = h
            .state
            .storage
            .list_plans(&h.user.id, &PlanFilter::default())
            .unwrap();
        assert_eq!(plans.len(), 1);
        let plan = &plans[0];
        assert_eq!(plan.name, "Push day");
        assert_eq!(plan.level, FitnessLevel::Advanced);
        assert_eq!(
            plan.exercises,
            vec![
                PlannedExercise::new("bench_press").with_targets(5, 5, 80.0),
                PlannedExercise::new("push_ups"),
            ]
        );
    }

    #[tokio::test]
    async fn create_plan_without_name_flashes_error() {
        let h = harness();
        let resp = send(
            &h.app,
            form_post("/create_plan", &h.cookie, "name=&exercises=squats"),
        )
        .await;
        assert_eq!(location(&resp), "/create_plan");
        let set_cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with(FLASH_COOKIE));
        assert!(set_cookie.contains("Workout+plan+name+is+required."));
    }

    #[tokio::test]
    async fn start_workout_on_foreign_plan_redirects() {
        let h = harness();
        let plan = WorkoutPlan::new("Theirs", "someone-else", vec![], FitnessLevel::Beginner)
            .unwrap();
        h.state.storage.save_plan(&plan).unwrap();

        let resp = send(&h.app, get(&format!("/start_workout/{}", plan.id), &h.cookie)).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/dashboard");
        assert!(h.state.storage.list_sessions(&h.user.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn complete_exercise_records_checked_sets() {
        let h = harness();
        let session = WorkoutSession::start("p1", &h.user.id, Utc::now());
        h.state.storage.save_session(&session).unwrap();

        let body = format!(
            "session_id={}&exercise_key=squats\
             &sets_completed%5B%5D=true&sets_completed%5B%5D=false\
             &reps_completed%5B%5D=10&reps_completed%5B%5D=10\
             &weights_used%5B%5D=60&weights_used%5B%5D=60",
            session.id
        );
        let resp = send(&h.app, form_post("/complete_exercise", &h.cookie, &body)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let payload: SuccessResponse = serde_json::from_str(&body_string(resp).await).unwrap();
        assert!(payload.success);

        let stored = h.state.storage.load_session(&session.id).unwrap().unwrap();
        assert_eq!(stored.exercises_completed.len(), 1);
        assert_eq!(stored.exercises_completed[0].sets.len(), 1);
        assert_eq!(stored.exercises_completed[0].volume(), 600.0);
    }

    #[tokio::test]
    async fn complete_exercise_unknown_session_is_404() {
        let h = harness();
        let resp = send(
            &h.app,
            form_post("/complete_exercise", &h.cookie, "session_id=nope&exercise_key=rows"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let payload: ErrorResponse = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(payload.error, "Session not found");
    }

    #[tokio::test]
    async fn progress_page_embeds_chart_data() {
        let h = harness();
        let mut session = WorkoutSession::start("p1", &h.user.id, Utc::now());
        session.record_exercise(CompletedExercise {
            exercise_key: "</script>".into(),
            sets: vec![],
        });
        session.complete("", Utc::now());
        h.state.storage.save_session(&session).unwrap();

        let resp = send(&h.app, get("/progress", &h.cookie)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp).await;
        assert!(html.contains("id=\"monthly-data\""));
        assert!(html.contains("id=\"monthly-chart\""));
        assert!(html.contains("class=\"volume-chart\""));
        assert!(html.contains("/static/progress.js"));
        assert!(html.contains("<\\/script>"));
    }

    #[tokio::test]
    async fn flash_is_shown_once_then_cleared() {
        let h = harness();
        let cookie = format!("{}; {FLASH_COOKIE}=success=Saved%21", h.cookie);
        let resp = send(&h.app, get("/exercise_library", &cookie)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cleared = resp
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(cleared.contains("Max-Age=0"));
        assert!(body_string(resp).await.contains("Saved!"));
    }

    fn flash_cookie(resp: &Response) -> String {
        resp.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|c| c.starts_with(FLASH_COOKIE))
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn health_reports_status_and_uptime() {
        let h = harness();
        let resp = send(&h.app, get("/health", "")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(json["uptimeSecs"].is_u64());
    }

    #[tokio::test]
    async fn workout_script_is_served_as_javascript() {
        let h = harness();
        let resp = send(&h.app, get("/static/workout.js", "")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "application/javascript; charset=utf-8"
        );
        assert!(body_string(resp).await.contains("/complete_exercise"));
    }

    #[tokio::test]
    async fn timer_and_chart_scripts_are_served() {
        let h = harness();
        let resp = send(&h.app, get("/static/timer.js", "")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_string(resp).await.contains("rest-timer-display"));

        let resp = send(&h.app, get("/static/progress.js", "")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let js = body_string(resp).await;
        assert!(js.contains("monthly-data"));
        assert!(js.contains("exercise-data"));

        let resp = send(&h.app, get("/static/sw.js", "")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn tracker_page_carries_timers_and_session_start() {
        let h = harness();
        let plan = WorkoutPlan::new(
            "Timed",
            &h.user.id,
            vec![PlannedExercise::new("squats")],
            FitnessLevel::Beginner,
        )
        .unwrap();
        h.state.storage.save_plan(&plan).unwrap();

        let resp = send(&h.app, get(&format!("/start_workout/{}", plan.id), &h.cookie)).await;
        let html = body_string(resp).await;
        assert!(html.contains("id=\"workout-timer\""));
        assert!(html.contains("id=\"rest-timer\""));
        assert!(html.contains("data-started=\""));
        assert!(html.contains("/static/timer.js"));
    }

    #[tokio::test]
    async fn create_plan_with_invalid_level_flashes_error() {
        let h = harness();
        let resp = send(
            &h.app,
            form_post(
                "/create_plan",
                &h.cookie,
                "name=Odd&level=expert&exercises=squats",
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/create_plan");
        assert!(flash_cookie(&resp).contains("invalid+fitness+level%3A+expert"));
        assert!(h
            .state
            .storage
            .list_plans(&h.user.id, &PlanFilter::default())
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn dashboard_ignores_invalid_level_filter() {
        let h = harness();
        for (name, level) in [("Easy", FitnessLevel::Beginner), ("Hard", FitnessLevel::Advanced)] {
            let plan = WorkoutPlan::new(name, &h.user.id, vec![], level).unwrap();
            h.state.storage.save_plan(&plan).unwrap();
        }

        let resp = send(&h.app, get("/dashboard?level=expert", &h.cookie)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp).await;
        assert!(html.contains("Easy"));
        assert!(html.contains("Hard"));
    }

    #[tokio::test]
    async fn create_plan_rejects_oversized_targets() {
        let h = harness();
        let resp = send(
            &h.app,
            form_post(
                "/create_plan",
                &h.cookie,
                "name=Huge&exercises=rows&sets_rows=4000000000",
            ),
        )
        .await;
        assert_eq!(location(&resp), "/create_plan");
        assert!(flash_cookie(&resp).contains("targets+out+of+range+for+rows"));
        assert!(h
            .state
            .storage
            .list_plans(&h.user.id, &PlanFilter::default())
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn failed_tracker_render_leaves_no_session() {
        let h = harness();
        // stored before targets were bounded
        let mut plan = WorkoutPlan::new(
            "Legacy",
            &h.user.id,
            vec![PlannedExercise::new("rows")],
            FitnessLevel::Unspecified,
        )
        .unwrap();
        plan.exercises[0].sets = 4_000_000_000;
        h.state.storage.save_plan(&plan).unwrap();

        let resp = send(&h.app, get(&format!("/start_workout/{}", plan.id), &h.cookie)).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(h.state.storage.list_sessions(&h.user.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn start_workout_renders_tracker_and_opens_session() {
        let h = harness();
        let plan = WorkoutPlan::new(
            "Pull",
            &h.user.id,
            vec![PlannedExercise::new("rows").with_targets(2, 8, 40.0)],
            FitnessLevel::Intermediate,
        )
        .unwrap();
        h.state.storage.save_plan(&plan).unwrap();

        let resp = send(&h.app, get(&format!("/start_workout/{}", plan.id), &h.cookie)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let sessions = h.state.storage.list_sessions(&h.user.id).unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(body_string(resp).await.contains(&sessions[0].id));
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let h = harness();
        let resp = send(&h.app, get("/nope", "")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
