use anyhow::{Context, Result, bail};
use chrono::{Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use forma_core::exercises::{Exercise, ExerciseSource};
use forma_core::models::Session;
use forma_core::sync::{
    AuthProvider, RemoteId, RemoteMealPlan, RemoteProfile, RemoteProgram, RemoteStore,
    RemoteWorkout, RemoteWorkoutSet,
};

use crate::config::SupabaseConfig;

const UPSERT_PREFER: &str = "resolution=merge-duplicates,return=representation";
const BY_LOCAL_ID: &str = "user_id,local_id";

/// PostgREST tables and GoTrue auth of a Supabase project.
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// GoTrue token payload. Signup without a session only carries the user.
#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<AuthUser>,
}

impl TokenResponse {
    fn into_session(self) -> Option<Session> {
        let access_token = self.access_token?;
        let user = self.user?;
        Some(Session {
            user_id: user.id,
            email: user.email,
            access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }
}

#[derive(Deserialize)]
struct IdRow {
    id: RemoteId,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("forma-cli/{}", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(20))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{endpoint}", self.base_url)
    }

    async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        bail!("{what} failed: {status} - {body}")
    }

    async fn upsert<T: Serialize + ?Sized>(
        &self,
        session: &Session,
        table: &str,
        on_conflict: &str,
        rows: &T,
    ) -> Result<reqwest::Response> {
        debug!("upsert into {table} on ({on_conflict})");
        let resp = self
            .client
            .post(self.rest_url(table))
            .query(&[("on_conflict", on_conflict)])
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .header("Prefer", UPSERT_PREFER)
            .json(rows)
            .send()
            .await
            .with_context(|| format!("Failed to reach {table}"))?;
        Self::check(resp, &format!("Upsert into {table}")).await
    }

    async fn token_request(&self, url: String, email: &str, password: &str) -> Result<TokenResponse> {
        let resp = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&Credentials { email, password })
            .send()
            .await
            .context("Failed to reach the auth service")?;
        let resp = Self::check(resp, "Authentication").await?;
        resp.json()
            .await
            .context("Failed to parse auth response")
    }
}

impl RemoteStore for SupabaseClient {
    async fn upsert_profile(&self, session: &Session, row: &RemoteProfile) -> Result<()> {
        self.upsert(session, "profiles", "id", std::slice::from_ref(row))
            .await?;
        Ok(())
    }

    async fn upsert_workout(&self, session: &Session, row: &RemoteWorkout) -> Result<RemoteId> {
        let resp = self
            .upsert(session, "workouts", BY_LOCAL_ID, std::slice::from_ref(row))
            .await?;
        let rows: Vec<IdRow> = resp
            .json()
            .await
            .context("Failed to parse upserted workout")?;
        rows.into_iter()
            .next()
            .map(|r| r.id)
            .context("Upsert returned no workout row")
    }

    async fn upsert_workout_sets(
        &self,
        session: &Session,
        rows: &[RemoteWorkoutSet],
    ) -> Result<()> {
        self.upsert(session, "workout_sets", BY_LOCAL_ID, rows).await?;
        Ok(())
    }

    async fn upsert_program(&self, session: &Session, row: &RemoteProgram) -> Result<()> {
        self.upsert(session, "workout_programs", BY_LOCAL_ID, std::slice::from_ref(row))
            .await?;
        Ok(())
    }

    async fn upsert_meal_plan(&self, session: &Session, row: &RemoteMealPlan) -> Result<()> {
        self.upsert(session, "meal_plans", BY_LOCAL_ID, std::slice::from_ref(row))
            .await?;
        Ok(())
    }
}

impl AuthProvider for SupabaseClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>> {
        let token = self
            .token_request(self.auth_url("signup"), email, password)
            .await?;
        Ok(token.into_session())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let token = self
            .token_request(self.auth_url("token?grant_type=password"), email, password)
            .await?;
        token
            .into_session()
            .context("Auth response did not include a session")
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        let resp = self
            .client
            .post(self.auth_url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .context("Failed to reach the auth service")?;
        Self::check(resp, "Sign out").await?;
        Ok(())
    }
}

impl ExerciseSource for SupabaseClient {
    async fn fetch_exercises(&self) -> Result<Vec<Exercise>> {
        let resp = self
            .client
            .get(self.rest_url("exercises"))
            .query(&[("select", "*"), ("order", "name")])
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .send()
            .await
            .context("Failed to reach the exercise catalog")?;
        let resp = Self::check(resp, "Exercise fetch").await?;
        resp.json()
            .await
            .context("Failed to parse exercise catalog")
    }
}
