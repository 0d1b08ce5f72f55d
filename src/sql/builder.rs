//! Builds parameterized statements from registered models.
//!
//! Identifiers come from registration (validated there) and are always quoted; values are always parameters.

use super::dialect::Dialect;
use crate::config::{Model, Sort, PAGE_SIZE};
use crate::fields::{Field, FieldKind, Relation, Value};

#[derive(Clone, Debug, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Placeholder for `v`, recording the parameter. NULL is written inline so it needs no type.
    fn placeholder(&mut self, d: Dialect, field: &Field, v: Value) -> &'static str {
        if v.is_null() {
            return "NULL";
        }
        let ph = match (&field.kind, &v) {
            (FieldKind::Timestamp { .. }, Value::Timestamp(_)) => d.timestamp_param(),
            _ => "?",
        };
        self.params.push(v);
        ph
    }
}

/// Join table backing a many-to-many field.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinTable {
    pub table: String,
    pub owner_column: String,
    pub related_column: String,
}

impl JoinTable {
    /// `<table>_<column>` with `<table>_id` and `<related_table>_id`.
    pub fn for_field(model: &Model, field: &Field, rel: &Relation) -> Self {
        let owner_column = format!("{}_id", model.table);
        let mut related_column = format!("{}_id", rel.table);
        if related_column == owner_column {
            related_column = format!("related_{}", related_column);
        }
        JoinTable {
            table: format!("{}_{}", model.table, field.attrs.column),
            owner_column,
            related_column,
        }
    }
}

fn column(d: Dialect, table: &str, col: &str) -> String {
    format!("{}.{}", d.quote(table), d.quote(col))
}

fn select_expr(d: Dialect, table: &str, field: &Field) -> String {
    let col = column(d, table, &field.attrs.column);
    match field.kind {
        FieldKind::Timestamp { .. } => d.timestamp_select(&col),
        _ => col,
    }
}

/// SELECT every stored column of one row.
pub fn select_by_id(d: Dialect, model: &Model, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cols = model
        .scalar_fields()
        .map(|f| select_expr(d, &model.table, f))
        .collect::<Vec<_>>()
        .join(", ");
    q.params.push(Value::Int(id));
    q.sql = d.queryf(format_args!(
        "SELECT {} FROM {} WHERE {} = ?",
        cols,
        d.quote(&model.table),
        column(d, &model.table, model.pk().column())
    ));
    q
}

/// Related ids currently linked to row `id`.
pub fn select_related_ids(d: Dialect, join: &JoinTable, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.params.push(Value::Int(id));
    q.sql = d.queryf(format_args!(
        "SELECT {} FROM {} WHERE {} = ? ORDER BY {}",
        d.quote(&join.related_column),
        d.quote(&join.table),
        d.quote(&join.owner_column),
        d.quote(&join.related_column)
    ));
    q
}

/// Shared FROM/WHERE of the list and count queries, plus the list select columns.
struct ListSource {
    columns: Vec<String>,
    from_where: String,
    params: Vec<Value>,
}

fn list_source(d: Dialect, model: &Model, search: Option<&str>) -> ListSource {
    let mut columns = Vec::new();
    let mut tables = vec![d.quote(&model.table)];
    let mut joins = Vec::new();
    let mut params = Vec::new();

    for field in model.list_fields() {
        match &field.kind {
            FieldKind::ForeignKey(rel) if rel.list_column.is_some() => {
                let alias = format!("r{}", tables.len());
                let list_column = rel.list_column.as_deref().unwrap_or_default();
                columns.push(column(d, &alias, list_column));
                tables.push(format!("{} AS {}", d.quote(&rel.table), d.quote(&alias)));
                joins.push(format!(
                    "{} = {}",
                    column(d, &model.table, &field.attrs.column),
                    column(d, &alias, &rel.related_pk)
                ));
            }
            _ => columns.push(select_expr(d, &model.table, field)),
        }
    }

    let mut conditions = Vec::new();
    if let Some(term) = search.filter(|s| !s.is_empty()) {
        if !model.searchable_columns.is_empty() {
            let pattern = format!("%{}%", escape_like(term));
            let ors = model
                .searchable_columns
                .iter()
                .map(|c| {
                    params.push(Value::Text(pattern.clone()));
                    format!("{} LIKE ? ESCAPE '\\'", column(d, &model.table, c))
                })
                .collect::<Vec<_>>();
            conditions.push(format!("({})", ors.join(" OR ")));
        }
    }
    conditions.extend(joins);

    let mut from_where = format!("FROM {}", tables.join(", "));
    if !conditions.is_empty() {
        from_where.push_str(" WHERE ");
        from_where.push_str(&conditions.join(" AND "));
    }
    ListSource {
        columns,
        from_where,
        params,
    }
}

/// Escape LIKE wildcards so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// One page of list columns. `page` starts at 1.
pub fn select_page(d: Dialect, model: &Model, search: Option<&str>, sort: &Sort, page: i64) -> QueryBuf {
    let src = list_source(d, model, search);
    let pk = model.pk();
    let sort_field = model.field_by_name(&sort.field).unwrap_or(pk);
    let direction = if sort.desc { "DESC" } else { "ASC" };
    let mut order = format!("{} {}", column(d, &model.table, sort_field.column()), direction);
    if sort_field.name() != pk.name() {
        order.push_str(&format!(", {} DESC", column(d, &model.table, pk.column())));
    }
    // pages past the end saturate to an offset that matches nothing
    let offset = (page.max(1) - 1).saturating_mul(PAGE_SIZE);
    QueryBuf {
        sql: d.queryf(format_args!(
            "SELECT {} {} ORDER BY {} LIMIT {} OFFSET {}",
            src.columns.join(", "),
            src.from_where,
            order,
            PAGE_SIZE,
            offset
        )),
        params: src.params,
    }
}

/// Total rows matching the list query.
pub fn count(d: Dialect, model: &Model, search: Option<&str>) -> QueryBuf {
    let src = list_source(d, model, search);
    QueryBuf {
        sql: d.queryf(format_args!("SELECT COUNT(*) {}", src.from_where)),
        params: src.params,
    }
}

/// INSERT of the given columns, returning the new identifier. With no columns the row gets database defaults.
pub fn insert(d: Dialect, model: &Model, values: &[(&Field, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = d.quote(&model.table);
    let returning = format!(" RETURNING {}", d.quote(model.pk().column()));
    if values.is_empty() {
        q.sql = d.queryf(format_args!("INSERT INTO {} DEFAULT VALUES{}", table, returning));
        return q;
    }
    let mut cols = Vec::with_capacity(values.len());
    let mut placeholders = Vec::with_capacity(values.len());
    for (field, v) in values {
        cols.push(d.quote(field.column()));
        placeholders.push(q.placeholder(d, field, v.clone()));
    }
    q.sql = d.queryf(format_args!(
        "INSERT INTO {} ({}) VALUES ({}){}",
        table,
        cols.join(", "),
        placeholders.join(", "),
        returning
    ));
    q
}

/// UPDATE of the given columns on row `id`. `values` must not be empty.
pub fn update(d: Dialect, model: &Model, id: i64, values: &[(&Field, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let sets = values
        .iter()
        .map(|(field, v)| format!("{} = {}", d.quote(field.column()), q.placeholder(d, field, v.clone())))
        .collect::<Vec<_>>();
    q.params.push(Value::Int(id));
    q.sql = d.queryf(format_args!(
        "UPDATE {} SET {} WHERE {} = ?",
        d.quote(&model.table),
        sets.join(", "),
        d.quote(model.pk().column())
    ));
    q
}

pub fn delete(d: Dialect, model: &Model, id: i64) -> QueryBuf {
    QueryBuf {
        sql: d.queryf(format_args!(
            "DELETE FROM {} WHERE {} = ?",
            d.quote(&model.table),
            d.quote(model.pk().column())
        )),
        params: vec![Value::Int(id)],
    }
}

pub fn insert_link(d: Dialect, join: &JoinTable, id: i64, related_id: i64) -> QueryBuf {
    QueryBuf {
        sql: d.queryf(format_args!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            d.quote(&join.table),
            d.quote(&join.owner_column),
            d.quote(&join.related_column)
        )),
        params: vec![Value::Int(id), Value::Int(related_id)],
    }
}

pub fn delete_link(d: Dialect, join: &JoinTable, id: i64, related_id: i64) -> QueryBuf {
    QueryBuf {
        sql: d.queryf(format_args!(
            "DELETE FROM {} WHERE {} = ? AND {} = ?",
            d.quote(&join.table),
            d.quote(&join.owner_column),
            d.quote(&join.related_column)
        )),
        params: vec![Value::Int(id), Value::Int(related_id)],
    }
}

/// Remove every link of row `id`.
pub fn delete_links(d: Dialect, join: &JoinTable, id: i64) -> QueryBuf {
    QueryBuf {
        sql: d.queryf(format_args!(
            "DELETE FROM {} WHERE {} = ?",
            d.quote(&join.table),
            d.quote(&join.owner_column)
        )),
        params: vec![Value::Int(id)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::snake_case_transform;
    use crate::config::{AdminBuilder, MemberDef, ModelDef, ModelRegistry};
    use chrono::NaiveDate;

    fn registry() -> ModelRegistry {
        let mut b = AdminBuilder::new().name_transform(snake_case_transform());
        b.register(
            "Blog",
            ModelDef::new("Category")
                .member(MemberDef::integer("Id"))
                .member(MemberDef::text("Title").tag("list search")),
        )
        .unwrap();
        b.register(
            "Blog",
            ModelDef::new("BlogPost")
                .admin_name("Blog post")
                .member(MemberDef::integer("Id"))
                .member(MemberDef::reference("Category", "Category").tag("list=Title"))
                .member(MemberDef::text("Title").tag("list search"))
                .member(MemberDef::text("Body").tag("search"))
                .member(MemberDef::timestamp("Published").tag("list"))
                .member(MemberDef::sequence("Tags", "Category")),
        )
        .unwrap();
        b.build().unwrap()
    }

    #[test]
    fn get_skips_many_to_many() {
        let reg = registry();
        let post = reg.get("blog-post").unwrap();
        let q = select_by_id(Dialect::Positional, post, 7);
        assert_eq!(
            q.sql,
            r#"SELECT "blog_post"."id", "blog_post"."category_id", "blog_post"."title", "blog_post"."body", "blog_post"."published" FROM "blog_post" WHERE "blog_post"."id" = ?"#
        );
        assert_eq!(q.params, vec![Value::Int(7)]);

        let q = select_by_id(Dialect::Numbered, post, 7);
        assert!(q.sql.contains(r#"CAST("blog_post"."published" AS TEXT)"#));
        assert!(q.sql.ends_with("= $1"));
    }

    #[test]
    fn page_with_search_and_related_column() {
        let reg = registry();
        let post = reg.get("blog-post").unwrap();
        let sort = Sort::parse("-Title");
        let q = select_page(Dialect::Positional, post, Some("50%_off"), &sort, 2);
        assert_eq!(
            q.sql,
            concat!(
                r#"SELECT "blog_post"."id", "r1"."title", "blog_post"."title", "blog_post"."published" "#,
                r#"FROM "blog_post", "category" AS "r1" "#,
                r#"WHERE ("blog_post"."title" LIKE ? ESCAPE '\' OR "blog_post"."body" LIKE ? ESCAPE '\') "#,
                r#"AND "blog_post"."category_id" = "r1"."id" "#,
                r#"ORDER BY "blog_post"."title" DESC, "blog_post"."id" DESC LIMIT 25 OFFSET 25"#
            )
        );
        assert_eq!(q.params, vec![Value::from("%50\\%\\_off%"), Value::from("%50\\%\\_off%")]);

        let c = count(Dialect::Numbered, post, Some("x"));
        assert_eq!(
            c.sql,
            concat!(
                r#"SELECT COUNT(*) FROM "blog_post", "category" AS "r1" "#,
                r#"WHERE ("blog_post"."title" LIKE $1 ESCAPE '\' OR "blog_post"."body" LIKE $2 ESCAPE '\') "#,
                r#"AND "blog_post"."category_id" = "r1"."id""#
            )
        );
    }

    #[test]
    fn page_without_search() {
        let reg = registry();
        let cat = reg.get("category").unwrap();
        let q = select_page(Dialect::Positional, cat, None, &cat.sort, 1);
        assert_eq!(
            q.sql,
            r#"SELECT "category"."id", "category"."title" FROM "category" ORDER BY "category"."id" DESC LIMIT 25 OFFSET 0"#
        );
        assert!(q.params.is_empty());
        let q = select_page(Dialect::Positional, cat, Some(""), &cat.sort, 0);
        assert!(q.sql.ends_with("OFFSET 0"));
        let q = select_page(Dialect::Positional, cat, None, &cat.sort, i64::MAX);
        assert!(q.sql.ends_with(&format!("OFFSET {}", i64::MAX)));
    }

    #[test]
    fn writes() {
        let reg = registry();
        let post = reg.get("blog-post").unwrap();
        let title = post.field_by_name("Title").unwrap();
        let published = post.field_by_name("Published").unwrap();
        let fk = post.field_by_name("CategoryId").unwrap();
        let t = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(3, 4, 0).unwrap();

        let values = vec![
            (title, Value::from("Hello")),
            (published, Value::Timestamp(t)),
            (fk, Value::Null),
        ];
        let q = insert(Dialect::Positional, post, &values);
        assert_eq!(
            q.sql,
            r#"INSERT INTO "blog_post" ("title", "published", "category_id") VALUES (?, ?, NULL) RETURNING "id""#
        );
        assert_eq!(q.params, vec![Value::from("Hello"), Value::Timestamp(t)]);

        let q = insert(Dialect::Numbered, post, &values);
        assert_eq!(
            q.sql,
            r#"INSERT INTO "blog_post" ("title", "published", "category_id") VALUES ($1, CAST($2 AS TIMESTAMP), NULL) RETURNING "id""#
        );

        let q = insert(Dialect::Positional, post, &[]);
        assert_eq!(q.sql, r#"INSERT INTO "blog_post" DEFAULT VALUES RETURNING "id""#);

        let q = update(Dialect::Numbered, post, 3, &values[..1]);
        assert_eq!(q.sql, r#"UPDATE "blog_post" SET "title" = $1 WHERE "id" = $2"#);
        assert_eq!(q.params, vec![Value::from("Hello"), Value::Int(3)]);

        let q = delete(Dialect::Positional, post, 3);
        assert_eq!(q.sql, r#"DELETE FROM "blog_post" WHERE "id" = ?"#);
    }

    #[test]
    fn join_table_layout() {
        let reg = registry();
        let post = reg.get("blog-post").unwrap();
        let tags = post.field_by_name("Tags").unwrap();
        let join = JoinTable::for_field(post, tags, tags.kind.relation().unwrap());
        assert_eq!(
            join,
            JoinTable {
                table: "blog_post_tags".into(),
                owner_column: "blog_post_id".into(),
                related_column: "category_id".into(),
            }
        );
        let q = insert_link(Dialect::Numbered, &join, 1, 4);
        assert_eq!(
            q.sql,
            r#"INSERT INTO "blog_post_tags" ("blog_post_id", "category_id") VALUES ($1, $2)"#
        );
        let q = delete_link(Dialect::Positional, &join, 1, 4);
        assert_eq!(
            q.sql,
            r#"DELETE FROM "blog_post_tags" WHERE "blog_post_id" = ? AND "category_id" = ?"#
        );
        let q = select_related_ids(Dialect::Positional, &join, 1);
        assert_eq!(
            q.sql,
            r#"SELECT "category_id" FROM "blog_post_tags" WHERE "blog_post_id" = ? ORDER BY "category_id""#
        );
        assert_eq!(delete_links(Dialect::Positional, &join, 1).params, vec![Value::Int(1)]);
    }
}
