//! Deterministic fake data for development databases
//!
//! Seeded RNG so repeated bringups on a fresh database produce the same
//! names. Every fake account uses the password `password`, hashed once and
//! shared.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ragtime_common::auth::hash_password;
use ragtime_common::db::models::User;
use ragtime_common::db::{comments, compositions, follows, users};
use ragtime_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;

/// Password shared by all fake accounts
pub const FAKE_PASSWORD: &str = "password";

const FIRST_NAMES: &[&str] = &[
    "scott", "jelly", "eubie", "fats", "james", "willie", "luckey", "mary", "joseph", "artie",
];

const LAST_NAMES: &[&str] = &[
    "joplin", "morton", "blake", "waller", "johnson", "lion", "roberts", "lamb", "scott", "matthews",
];

const TITLE_WORDS: &[&str] = &[
    "Maple", "Entertainer", "Solace", "Cascade", "Gladiolus", "Pineapple", "Sunflower", "Chrysanthemum",
    "Elite", "Paragon", "Cakewalk", "Nonpareil", "Favorite", "Searchlight", "Rosebud",
];

const RAG_KINDS: &[&str] = &["Rag", "Waltz", "March", "Two-Step", "Drag", "Strut"];

fn fake_username(rng: &mut StdRng, index: usize) -> String {
    let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
    let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
    // Index suffix keeps generated usernames unique
    format!("{}.{}{}", first, last, index)
}

fn fake_title(rng: &mut StdRng) -> String {
    let word = TITLE_WORDS[rng.gen_range(0..TITLE_WORDS.len())];
    let kind = RAG_KINDS[rng.gen_range(0..RAG_KINDS.len())];
    format!("{} {}", word, kind)
}

/// Create `count` fake users; the first created user is returned so the
/// caller can print sample credentials
pub async fn seed_users(
    pool: &SqlitePool,
    count: usize,
    admin_email: Option<&str>,
) -> Result<Vec<User>> {
    let mut rng = StdRng::seed_from_u64(1899);
    let password_hash = hash_password(FAKE_PASSWORD)?;

    let mut created = Vec::with_capacity(count);
    for index in 0..count {
        let username = fake_username(&mut rng, index);
        let email = format!("{}@example.com", username);
        // A rerun regenerates the same names; accounts that already exist
        // are kept, not an error
        match users::create_user(pool, &email, &username, &password_hash, admin_email).await {
            Ok(user) => created.push(user),
            Err(Error::Conflict(_)) => continue,
            Err(e) => return Err(e),
        }
    }

    info!("Seeded {} fake users", created.len());
    Ok(created)
}

/// Each user follows a few random others
pub async fn seed_follows(pool: &SqlitePool, seeded: &[User]) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(1901);

    for user in seeded {
        for _ in 0..rng.gen_range(1..5) {
            let other = &seeded[rng.gen_range(0..seeded.len())];
            if other.guid != user.guid {
                follows::follow(pool, &user.guid, &other.guid).await?;
            }
        }
    }

    Ok(())
}

/// A handful of compositions per user, with a few comments each
pub async fn seed_compositions(pool: &SqlitePool, seeded: &[User]) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(1902);

    for user in seeded {
        for _ in 0..rng.gen_range(0..4) {
            let title = fake_title(&mut rng);
            let release_type = rng.gen_range(1..=3);
            let composition = compositions::create_composition(
                pool,
                &user.guid,
                release_type,
                &title,
                Some("Seeded for development."),
            )
            .await?;

            for _ in 0..rng.gen_range(0..3) {
                let commenter = &seeded[rng.gen_range(0..seeded.len())];
                comments::create_comment(pool, &composition.guid, &commenter.guid, "Love this one.")
                    .await?;
            }
        }
    }

    Ok(())
}

/// Populate a development database with users, follows, compositions and
/// comments; returns the first seeded user
pub async fn seed_all(
    pool: &SqlitePool,
    count: usize,
    admin_email: Option<&str>,
) -> Result<Option<User>> {
    let seeded = seed_users(pool, count, admin_email).await?;
    seed_follows(pool, &seeded).await?;
    seed_compositions(pool, &seeded).await?;
    Ok(seeded.into_iter().next())
}
