use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Demo organization: one admin, one manager with three reports, one of
/// whom has no messaging identity yet.
const SEED_USERS: &[SeededUser] = &[
    SeededUser { id: 1, messaging_id: Some("U-demo-admin"), name: "Aiko Admin", role: "admin" },
    SeededUser {
        id: 2,
        messaging_id: Some("U-demo-manager"),
        name: "Mika Manager",
        role: "manager",
    },
    SeededUser { id: 3, messaging_id: Some("U-demo-emp-1"), name: "Emi Employee", role: "employee" },
    SeededUser { id: 4, messaging_id: Some("U-demo-emp-2"), name: "Ken Employee", role: "employee" },
    SeededUser { id: 5, messaging_id: None, name: "Rin Unlinked", role: "employee" },
];

pub struct DemoOrganization;

impl DemoOrganization {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_org.sql");

    /// Loads the demo users. Safe to run repeatedly.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult { users_seeded: SEED_USERS.to_vec() })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(SEED_USERS.len());

        for user in SEED_USERS {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                    SELECT 1 FROM app_user
                    WHERE id = ?1 AND name = ?2 AND role = ?3 AND messaging_id IS ?4
                 )",
            )
            .bind(user.id)
            .bind(user.name)
            .bind(user.role)
            .bind(user.messaging_id)
            .fetch_one(pool)
            .await?;
            checks.push((user.name, present == 1));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the demo users along with their attendance rows.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        for user in SEED_USERS.iter().rev() {
            sqlx::query("DELETE FROM attendance WHERE user_id = ?")
                .bind(user.id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM app_user WHERE id = ?").bind(user.id).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeededUser {
    pub id: i64,
    pub messaging_id: Option<&'static str>,
    pub name: &'static str,
    pub role: &'static str,
}

#[derive(Debug)]
pub struct SeedResult {
    pub users_seeded: Vec<SeededUser>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
