use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;

use tikitaka_db::models::{FeedFilter, TeamStats};
use tikitaka_types::api::{Confederation, MIN_SEARCH_LEN, PageQuery, SearchQuery, StatsQuery};
use tikitaka_types::pagination::{MAX_PAGE_SIZE, Page, parse_positive};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::Id;

const STATS_LIMIT: i64 = 10;
const ACTIVE_WINDOW_DAYS: i64 = 7;
const MAX_ACTIVE_WINDOW_DAYS: i64 = 365;
const TEAM_POSTS_PAGE_SIZE: i64 = 10;
const FANS_PAGE_SIZE: i64 = 20;
const TEAM_PREVIEW_SIZE: i64 = 10;

pub async fn list_teams(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let teams = state.db.list_teams().await?;

    let mut by_confederation: BTreeMap<&str, Vec<&TeamStats>> = BTreeMap::new();
    for team in &teams {
        by_confederation.entry(team.confederation.as_str()).or_default().push(team);
    }

    Ok(Json(json!({
        "success": true,
        "teams": teams,
        "teams_by_confederation": by_confederation,
    })))
}

pub async fn search_teams(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let term = search_term(query.q.as_deref())?;
    let teams = state.db.search_teams(term).await?;

    Ok(Json(json!({
        "success": true,
        "query": term,
        "teams": teams,
    })))
}

pub async fn by_confederation(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let confederation: Confederation = raw
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid confederation"))?;
    let teams = state.db.teams_in_confederation(confederation.as_str()).await?;

    Ok(Json(json!({
        "success": true,
        "confederation": confederation,
        "teams": teams,
    })))
}

pub async fn popular_teams(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = stats_limit(query.limit.as_deref());
    let teams = state.db.popular_teams(limit).await?;

    Ok(Json(json!({
        "success": true,
        "popular_teams": teams,
    })))
}

pub async fn active_teams(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = stats_limit(query.limit.as_deref());
    let days = parse_positive(query.days.as_deref())
        .unwrap_or(ACTIVE_WINDOW_DAYS)
        .min(MAX_ACTIVE_WINDOW_DAYS);
    let teams = state.db.active_teams(days, limit).await?;

    Ok(Json(json!({
        "success": true,
        "days_period": days,
        "active_teams": teams,
    })))
}

/// Team card with its latest posts and most active fans.
pub async fn get_team(State(state): State<AppState>, Id(team_id): Id) -> ApiResult<impl IntoResponse> {
    let team = state
        .db
        .team(team_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;

    let filter = FeedFilter {
        team_id: Some(team_id),
        author_id: None,
    };
    let recent_posts = state.db.feed(filter, TEAM_PREVIEW_SIZE, 0).await?;
    let top_fans = state.db.team_fans(team_id, TEAM_PREVIEW_SIZE, 0).await?;

    let mut body = serde_json::to_value(&team).map_err(anyhow::Error::from)?;
    body["recent_posts"] = json!(recent_posts);
    body["top_fans"] = json!(top_fans);

    Ok(Json(json!({
        "success": true,
        "team": body,
    })))
}

pub async fn team_posts(
    State(state): State<AppState>,
    Id(team_id): Id,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.team_exists(team_id).await? {
        return Err(ApiError::not_found("Team not found"));
    }

    let page = Page::from_query(query.page.as_deref(), query.limit.as_deref(), TEAM_POSTS_PAGE_SIZE);
    let filter = FeedFilter {
        team_id: Some(team_id),
        author_id: None,
    };
    let posts = state.db.feed(filter, page.limit, page.offset()).await?;
    let total = state.db.count_feed(filter).await?;

    let pagination = page.info_with_total(posts.len(), total);
    Ok(Json(json!({
        "success": true,
        "posts": posts,
        "pagination": pagination,
    })))
}

pub async fn team_fans(
    State(state): State<AppState>,
    Id(team_id): Id,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let team_name = state
        .db
        .team_name(team_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;

    let page = Page::from_query(query.page.as_deref(), query.limit.as_deref(), FANS_PAGE_SIZE);
    let fans = state.db.team_fans(team_id, page.limit, page.offset()).await?;

    let pagination = page.info(fans.len());
    Ok(Json(json!({
        "success": true,
        "team_name": team_name,
        "fans": fans,
        "pagination": pagination,
    })))
}

fn stats_limit(raw: Option<&str>) -> i64 {
    parse_positive(raw).unwrap_or(STATS_LIMIT).min(MAX_PAGE_SIZE)
}

/// Trimmed search term, or 400 when it is too short.
pub(crate) fn search_term(raw: Option<&str>) -> ApiResult<&str> {
    let term = raw.map(str::trim).unwrap_or_default();
    if term.chars().count() < MIN_SEARCH_LEN {
        return Err(ApiError::bad_request(format!(
            "Search query must be at least {MIN_SEARCH_LEN} characters"
        )));
    }
    Ok(term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_terms_need_two_characters() {
        assert!(search_term(None).is_err());
        assert!(search_term(Some(" a ")).is_err());
        assert_eq!(search_term(Some(" ar ")).unwrap(), "ar");
    }

    #[test]
    fn stats_limit_defaults_and_clamps() {
        assert_eq!(stats_limit(None), 10);
        assert_eq!(stats_limit(Some("3")), 3);
        assert_eq!(stats_limit(Some("500")), MAX_PAGE_SIZE);
        assert_eq!(stats_limit(Some("nope")), 10);
    }
}
