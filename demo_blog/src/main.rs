//! Blog admin demo: registers `Category` and `BlogPost` and serves the admin API.
//!
//! Run from repo root: `cargo run -p demo-blog`

use admin_panel::{
    admin_router, connect, ensure_database_exists, snake_case_transform, AdminBuilder, AppState, Dialect,
    MemberDef, ModelDef, Settings,
};
use tokio::net::TcpListener;

const SQLITE_SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS category (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT ''
    )",
    "CREATE TABLE IF NOT EXISTS blog_post (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category_id INTEGER REFERENCES category (id),
        title TEXT NOT NULL DEFAULT '',
        body TEXT NOT NULL DEFAULT '',
        cover TEXT NOT NULL DEFAULT '',
        published TEXT,
        draft BOOLEAN NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS blog_post_related (
        blog_post_id INTEGER NOT NULL,
        related_blog_post_id INTEGER NOT NULL,
        PRIMARY KEY (blog_post_id, related_blog_post_id)
    )",
];

const POSTGRES_SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS category (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT ''
    )",
    "CREATE TABLE IF NOT EXISTS blog_post (
        id BIGSERIAL PRIMARY KEY,
        category_id BIGINT REFERENCES category (id),
        title TEXT NOT NULL DEFAULT '',
        body TEXT NOT NULL DEFAULT '',
        cover TEXT NOT NULL DEFAULT '',
        published TIMESTAMP,
        draft BOOLEAN NOT NULL DEFAULT FALSE
    )",
    "CREATE TABLE IF NOT EXISTS blog_post_related (
        blog_post_id BIGINT NOT NULL,
        related_blog_post_id BIGINT NOT NULL,
        PRIMARY KEY (blog_post_id, related_blog_post_id)
    )",
];

fn category() -> ModelDef {
    ModelDef::new("Category")
        .member(MemberDef::integer("Id"))
        .member(MemberDef::text("Title").tag("list search maxlength=80"))
        .member(MemberDef::text("Description").tag("list blank textarea"))
}

fn blog_post() -> ModelDef {
    ModelDef::new("BlogPost")
        .admin_name("Blog post")
        .sort_by("-Published")
        .member(MemberDef::integer("Id"))
        .member(MemberDef::reference("Category", "Category").tag("list=Title width=3"))
        .member(MemberDef::text("Title").tag("list search width=9"))
        .member(MemberDef::text("Body").tag("textarea blank search"))
        .member(MemberDef::text("Cover").tag("field=file upload_to=covers blank"))
        .member(MemberDef::timestamp("Published").tag("list null width=6"))
        .member(MemberDef::boolean("Draft").tag("list width=6"))
        .member(MemberDef::sequence("Related", "BlogPost").tag("blank"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("admin_panel=info,demo_blog=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    ensure_database_exists(&settings.database_url).await?;
    let pool = connect(&settings.database_url, settings.max_connections).await?;
    let schema = match settings.dialect() {
        Dialect::Numbered => POSTGRES_SCHEMA,
        Dialect::Positional => SQLITE_SCHEMA,
    };
    for ddl in schema {
        sqlx::query(ddl).execute(&pool).await?;
    }

    let mut builder = AdminBuilder::new().name_transform(snake_case_transform());
    builder.register("Blog", category())?;
    builder.register("Blog", blog_post())?;
    let models = builder.build()?;

    let state = AppState::new(pool, models, &settings)?;
    let app = admin_router(state, settings.body_limit);
    let listener = TcpListener::bind(&settings.bind).await?;
    let addr = listener.local_addr()?;
    tracing::info!("blog admin listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
