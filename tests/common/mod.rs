#![allow(dead_code)]

use admin_panel::{
    snake_case_transform, store, AdminBuilder, FormData, MemberDef, Model, ModelDef, ModelRegistry,
};
use sqlx::AnyPool;

pub const SCHEMA: &[&str] = &[
    "CREATE TABLE category (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT DEFAULT ''
    )",
    "CREATE TABLE blog_post (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category_id INTEGER,
        title TEXT NOT NULL DEFAULT '',
        body TEXT NOT NULL DEFAULT '',
        published TEXT,
        draft BOOLEAN NOT NULL DEFAULT 0
    )",
    "CREATE TABLE blog_post_related (
        blog_post_id INTEGER NOT NULL,
        related_blog_post_id INTEGER NOT NULL,
        PRIMARY KEY (blog_post_id, related_blog_post_id)
    )",
    "CREATE TABLE attachment (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        document TEXT NOT NULL DEFAULT ''
    )",
    "CREATE TABLE playlist (id INTEGER PRIMARY KEY AUTOINCREMENT)",
    "CREATE TABLE playlist_songs (
        playlist_id INTEGER NOT NULL,
        category_id INTEGER NOT NULL,
        PRIMARY KEY (playlist_id, category_id)
    )",
];

pub fn category() -> ModelDef {
    ModelDef::new("Category")
        .member(MemberDef::integer("Id"))
        .member(MemberDef::text("Title").tag("list search maxlength=40"))
        .member(MemberDef::text("Description").tag("list blank"))
}

pub fn blog_post() -> ModelDef {
    ModelDef::new("BlogPost")
        .admin_name("Blog post")
        .member(MemberDef::integer("Id"))
        .member(MemberDef::reference("Category", "Category").tag("list=Title width=3"))
        .member(MemberDef::text("Title").tag("list search width=9"))
        .member(MemberDef::text("Body").tag("textarea blank"))
        .member(MemberDef::timestamp("Published").tag("list null"))
        .member(MemberDef::boolean("Draft").tag("list width=1"))
        .member(MemberDef::sequence("Related", "BlogPost").tag("blank"))
}

pub fn attachment() -> ModelDef {
    ModelDef::new("Attachment")
        .member(MemberDef::integer("Id"))
        .member(MemberDef::text("Name").tag("list"))
        .member(MemberDef::text("Document").tag("field=file upload_to=docs"))
}

/// Nothing but links: saving one inserts a row of database defaults.
pub fn playlist() -> ModelDef {
    ModelDef::new("Playlist")
        .member(MemberDef::integer("Id"))
        .member(MemberDef::sequence("Songs", "Category").tag("blank"))
}

pub fn registry() -> ModelRegistry {
    let mut b = AdminBuilder::new().name_transform(snake_case_transform());
    b.register("Blog", blog_post()).unwrap();
    b.register("Blog", category()).unwrap();
    b.register("Files", attachment()).unwrap();
    b.register("Music", playlist()).unwrap();
    b.build().unwrap()
}

pub async fn pool() -> AnyPool {
    let pool = store::connect("sqlite::memory:", 1).await.unwrap();
    for ddl in SCHEMA {
        sqlx::query(ddl).execute(&pool).await.unwrap();
    }
    pool
}

pub fn model<'a>(reg: &'a ModelRegistry, slug: &str) -> &'a Model {
    reg.get(slug).unwrap()
}

pub fn category_form(title: &str) -> FormData {
    FormData::new().value("Title", title).value("Description", "")
}

pub fn post_form(category: i64, title: &str) -> FormData {
    FormData::new()
        .value("CategoryId", category.to_string())
        .value("Title", title)
}
