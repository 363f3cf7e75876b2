// Sample data generator: users, follows, posts, comments, replies and likes

use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use social_feed::{
    app_state::AppState,
    config::Config,
    core::EntityId,
    error::AppResult,
    models::NewUser,
};

const SAMPLE_USERS: &[(&str, &str, &str)] = &[
    ("Alice", "Johnson", "alice"),
    ("Bob", "Smith", "bob"),
    ("Carol", "Davis", "carol"),
    ("David", "Wilson", "david"),
    ("Eve", "Brown", "eve"),
    ("Frank", "Miller", "frank"),
    ("Grace", "Lee", "grace"),
    ("Henry", "Taylor", "henry"),
];

const SAMPLE_POSTS: &[&str] = &[
    "Just shipped a new feature!",
    "Beautiful sunset today",
    "Reading a great book on distributed systems",
    "Coffee first, then code",
    "Hello world from the new feed",
    "Anyone up for a hike this weekend?",
    "Finally fixed that flaky test",
    "Trying out a new recipe tonight",
];

const SAMPLE_COMMENTS: &[&str] = &[
    "Great post!",
    "Totally agree",
    "Thanks for sharing",
    "This made my day",
    "Interesting take",
];

const SAMPLE_REPLIES: &[&str] = &["Thanks!", "Glad you liked it", "Right?", "Haha, yes"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("seed=info,social_feed=info")),
        )
        .init();

    let config = Config::from_env()?;
    if config.database.url.contains(":memory:") {
        warn!("DATABASE_URL is in-memory; seeded data is discarded when this process exits");
    }

    let state = AppState::new(config).await?;
    seed(&state).await?;
    Ok(())
}

async fn seed(state: &AppState) -> AppResult<()> {
    let social = &state.social;
    let mut rng = rand::rng();
    let suffix: u32 = rng.random_range(1000..10000);

    let mut users = Vec::with_capacity(SAMPLE_USERS.len());
    for (name, last_name, handle) in SAMPLE_USERS {
        let username = format!("{}{}", handle, suffix);
        let user = social
            .create_user(NewUser {
                name: name.to_string(),
                last_name: last_name.to_string(),
                email: format!("{}@example.com", username),
                username,
            })
            .await?;
        users.push(user.id);
    }
    info!("Created {} users", users.len());

    let mut follows = 0;
    for &user in &users {
        for &target in &users {
            if user != target && rng.random_bool(0.4) && social.follow(user, target).await? {
                follows += 1;
            }
        }
    }
    info!("Created {} follows", follows);

    let mut posts: Vec<EntityId> = Vec::new();
    for &user in &users {
        for _ in 0..rng.random_range(1..4) {
            let content = pick(&mut rng, SAMPLE_POSTS);
            posts.push(social.create_post(user, content).await?.id);
        }
    }
    info!("Created {} posts", posts.len());

    let (mut comments, mut replies, mut likes) = (0, 0, 0);
    for &post in &posts {
        for &user in &users {
            if rng.random_bool(0.3) && social.like_post(user, post).await? {
                likes += 1;
            }
        }

        for _ in 0..rng.random_range(0..4) {
            let author = *users.choose(&mut rng).unwrap_or(&users[0]);
            let comment = social
                .create_comment(author, post, pick(&mut rng, SAMPLE_COMMENTS))
                .await?;
            comments += 1;

            for &user in &users {
                if rng.random_bool(0.2) && social.like_comment(user, comment.id).await? {
                    likes += 1;
                }
            }

            for _ in 0..rng.random_range(0..3) {
                let replier = *users.choose(&mut rng).unwrap_or(&users[0]);
                social
                    .create_reply(replier, comment.id, pick(&mut rng, SAMPLE_REPLIES))
                    .await?;
                replies += 1;
            }
        }
    }

    info!(
        users = users.len(),
        follows,
        posts = posts.len(),
        comments,
        replies,
        likes,
        "Sample data generated"
    );
    Ok(())
}

fn pick<'a>(rng: &mut impl Rng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or("hello")
}
