//! Model registration: model descriptions in, registry of built models out.

use crate::case::{is_sql_identifier, slugify, transform_name, NameTransform};
use crate::config::resolved::{Model, ModelGroup, ModelRegistry, Sort};
use crate::config::resolver::{FieldRef, Resolver};
use crate::config::types::{FieldOptions, GroupDef, MemberDef, MemberKind, ModelDef, TypeKey};
use crate::config::validator::validate;
use crate::error::ConfigError;
use crate::fields::{CustomField, Field, FieldAttrs, FieldKind, FieldRegistry, FieldType, Relation};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Parse a JSON array of groups, each `{ "name": ..., "models": [ModelDef, ...] }`.
pub fn models_from_json(json: &str) -> Result<Vec<GroupDef>, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

/// A model accepted by `register`, waiting for `build`.
struct Prepared {
    def: ModelDef,
    slug: String,
    table: String,
    /// Members that are not skipped, with normalized options.
    members: Vec<(MemberDef, FieldOptions)>,
}

struct PendingGroup {
    name: String,
    models: Vec<Prepared>,
}

/// Where a relationship target lives, known after identities are registered.
struct Target {
    table: String,
    pk_column: String,
}

#[derive(Default)]
pub struct AdminBuilder {
    name_transform: Option<NameTransform>,
    fields: FieldRegistry,
    groups: Vec<PendingGroup>,
}

impl AdminBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform applied to every derived table and column name.
    pub fn name_transform(mut self, transform: NameTransform) -> Self {
        self.name_transform = Some(transform);
        self
    }

    pub fn register_custom(&mut self, name: &str, field: Arc<dyn CustomField>) -> Result<(), ConfigError> {
        self.fields.register_custom(name, field)
    }

    fn transform(&self, name: &str) -> String {
        transform_name(self.name_transform.as_ref(), name)
    }

    /// Accept a model into `group`. Syntactic problems fail here; relationships are checked by `build`.
    pub fn register(&mut self, group: &str, def: ModelDef) -> Result<(), ConfigError> {
        validate(&def)?;

        let mut members = Vec::with_capacity(def.members.len());
        for (i, member) in def.members.iter().enumerate() {
            let opts = member.config.normalize(&member.name)?;
            if opts.skip {
                if i == 0 {
                    return Err(ConfigError::FirstColumnSkipped {
                        model: def.type_name.clone(),
                    });
                }
                continue;
            }
            members.push((member.clone(), opts));
        }

        let slug = slugify(def.display_name());
        if slug.is_empty() {
            return Err(ConfigError::InvalidIdentifier(def.display_name().to_string()));
        }
        let table = self.transform(&def.type_name);
        if !is_sql_identifier(&table) {
            return Err(ConfigError::InvalidIdentifier(table));
        }

        let prepared = Prepared {
            def,
            slug,
            table,
            members,
        };
        match self.groups.iter_mut().find(|g| g.name == group) {
            Some(g) => g.models.push(prepared),
            None => self.groups.push(PendingGroup {
                name: group.to_string(),
                models: vec![prepared],
            }),
        }
        Ok(())
    }

    pub fn register_groups(&mut self, groups: Vec<GroupDef>) -> Result<(), ConfigError> {
        for group in groups {
            for def in group.models {
                self.register(&group.name, def)?;
            }
        }
        Ok(())
    }

    /// Register every identity, then build fields against the complete set.
    pub fn build(self) -> Result<ModelRegistry, ConfigError> {
        let mut resolver = Resolver::new();
        let mut targets: HashMap<TypeKey, Target> = HashMap::new();
        let mut slugs = HashSet::new();

        for p in self.groups.iter().flat_map(|g| &g.models) {
            let key = p.def.type_key();
            if targets.contains_key(&key) {
                return Err(ConfigError::DuplicateModel(key.0));
            }
            if !slugs.insert(p.slug.clone()) {
                return Err(ConfigError::DuplicateModel(p.slug.clone()));
            }
            let pk_name = p.members.first().map(|(m, _)| field_name(m)).unwrap_or_default();
            targets.insert(
                key.clone(),
                Target {
                    table: p.table.clone(),
                    pk_column: self.transform(&pk_name),
                },
            );
            resolver.register(key, p.slug.clone());
        }

        let mut models = Vec::new();
        let mut groups = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            let mut group_slugs = Vec::with_capacity(group.models.len());
            for p in &group.models {
                let model = self.build_model(p, &mut resolver, &targets)?;
                tracing::info!(model = %model.name, slug = %model.slug, table = %model.table, "registered model");
                group_slugs.push(model.slug.clone());
                models.push(model);
            }
            groups.push(ModelGroup {
                name: group.name.clone(),
                slug: slugify(&group.name),
                models: group_slugs,
            });
        }

        let dangling = resolver.dangling();
        if !dangling.is_empty() {
            return Err(ConfigError::DanglingReferences(dangling));
        }
        Ok(ModelRegistry::new(models, groups))
    }

    fn build_model(
        &self,
        p: &Prepared,
        resolver: &mut Resolver,
        targets: &HashMap<TypeKey, Target>,
    ) -> Result<Model, ConfigError> {
        let type_key = p.def.type_key();
        let mut fields = Vec::with_capacity(p.members.len());
        let mut list_fields = Vec::new();
        let mut searchable_columns = Vec::new();

        for (i, (member, opts)) in p.members.iter().enumerate() {
            let name = field_name(member);
            let column = self.transform(&name);
            if !is_sql_identifier(&column) {
                return Err(ConfigError::InvalidIdentifier(column));
            }

            let mut kind = self.build_kind(&p.def, member, &name, opts, targets)?;
            if let Some(rel) = kind.relation_mut() {
                let field = FieldRef {
                    model: type_key.clone(),
                    field: name.clone(),
                };
                rel.model_slug = resolver.defer_or_resolve(field, &rel.target);
            }

            let mut attrs = FieldAttrs::new(name.as_str(), column);
            if let Some(label) = &opts.label {
                attrs.label = label.clone();
            }
            attrs.blank = opts.blank || matches!(kind, FieldKind::Boolean);
            attrs.null = opts.null;
            attrs.list = (i == 0 || opts.list) && !kind.is_many_to_many();
            if let Some(width) = opts.width {
                if !(1..=12).contains(&width) {
                    return Err(invalid_option(&name, "width", width.to_string(), "must be between 1 and 12"));
                }
                attrs.width = width;
            }
            if let Some(default) = &opts.default {
                let value = kind
                    .validate(default)
                    .map_err(|e| invalid_option(&name, "default", default.clone(), &e.to_string()))?;
                attrs.default = Some(value);
            }
            if opts.search && !kind.is_many_to_many() {
                attrs.searchable = true;
                searchable_columns.push(attrs.column.clone());
            }
            if attrs.list {
                list_fields.push(i);
            }
            fields.push(Field::new(attrs, kind));
        }

        let default_sort = Sort {
            field: fields[0].attrs.name.clone(),
            desc: true,
        };
        let sort = p
            .def
            .sort_by
            .as_deref()
            .map(Sort::parse)
            .filter(|s| {
                fields
                    .iter()
                    .any(|f| f.attrs.name == s.field && !f.kind.is_many_to_many())
            })
            .unwrap_or(default_sort);

        Ok(Model {
            name: p.def.display_name().to_string(),
            slug: p.slug.clone(),
            type_key,
            table: p.table.clone(),
            fields,
            list_fields,
            searchable_columns,
            sort,
        })
    }

    fn build_kind(
        &self,
        def: &ModelDef,
        member: &MemberDef,
        name: &str,
        opts: &FieldOptions,
        targets: &HashMap<TypeKey, Target>,
    ) -> Result<FieldKind, ConfigError> {
        if let Some(override_name) = &opts.field {
            return match self.fields.get(override_name) {
                Some(FieldType::Url) => Ok(FieldKind::Url),
                Some(FieldType::File) => Ok(FieldKind::file(opts)),
                Some(FieldType::Custom(prototype)) => Ok(FieldKind::Custom(prototype.configure(opts)?)),
                None => Err(ConfigError::UnknownFieldType {
                    field: name.to_string(),
                    name: override_name.clone(),
                }),
            };
        }

        let relation = |target: &TypeKey| -> Result<Relation, ConfigError> {
            let (table, related_pk) = match targets.get(target) {
                Some(t) => (t.table.clone(), t.pk_column.clone()),
                None => (self.transform(target.as_str()), self.transform("Id")),
            };
            let list_column = opts.list_column.as_deref().map(|c| self.transform(c));
            if let Some(c) = list_column.as_deref().filter(|c| !is_sql_identifier(c)) {
                return Err(ConfigError::InvalidIdentifier(c.to_string()));
            }
            Ok(Relation {
                target: target.clone(),
                table,
                related_pk,
                list_column,
                model_slug: None,
            })
        };

        Ok(match &member.kind {
            MemberKind::Text => FieldKind::text(opts),
            MemberKind::Integer => FieldKind::integer(name, opts)?,
            MemberKind::Float => FieldKind::float(name, opts)?,
            MemberKind::Boolean => FieldKind::Boolean,
            MemberKind::Timestamp => FieldKind::timestamp(opts),
            MemberKind::Reference(target) => FieldKind::ForeignKey(relation(target)?),
            MemberKind::Sequence(target) => FieldKind::ManyToMany(relation(target)?),
            MemberKind::Unknown(kind) => {
                tracing::warn!(model = %def.type_name, member = %member.name, kind = %kind, "unknown member kind, using text field");
                FieldKind::text(opts)
            }
        })
    }
}

/// Field name for a member: references carry an `Id` suffix.
fn field_name(member: &MemberDef) -> String {
    match member.kind {
        MemberKind::Reference(_) => format!("{}Id", member.name),
        _ => member.name.clone(),
    }
}

fn invalid_option(field: &str, key: &'static str, value: String, reason: &str) -> ConfigError {
    ConfigError::InvalidOption {
        field: field.to_string(),
        key,
        value,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::snake_case_transform;
    use crate::error::ValidationError;
    use crate::fields::Value;

    fn category() -> ModelDef {
        ModelDef::new("Category")
            .member(MemberDef::integer("Id"))
            .member(MemberDef::text("Title").tag("list search"))
            .member(MemberDef::text("Description").tag("list"))
    }

    fn blog_post() -> ModelDef {
        ModelDef::new("BlogPost")
            .admin_name("Blog post")
            .member(MemberDef::integer("Id"))
            .member(MemberDef::reference("Category", "Category").tag("list=Title width=3"))
            .member(MemberDef::text("Title").tag("list search width=9"))
            .member(MemberDef::text("Body").tag("textarea"))
            .member(MemberDef::timestamp("Published").tag("list width=11"))
            .member(MemberDef::boolean("Draft").tag("list width=1"))
            .member(MemberDef::sequence("Related", "BlogPost").tag("list blank"))
    }

    #[test]
    fn builds_blog_models() {
        let mut b = AdminBuilder::new().name_transform(snake_case_transform());
        b.register("Blog", category()).unwrap();
        b.register("Blog", blog_post()).unwrap();
        let reg = b.build().unwrap();

        let post = reg.get("blog-post").unwrap();
        assert_eq!(post.name, "Blog post");
        assert_eq!(post.table, "blog_post");
        assert_eq!(post.searchable_columns, vec!["title"]);
        assert_eq!(post.sort, Sort { field: "Id".into(), desc: true });

        let fk = post.field_by_name("CategoryId").unwrap();
        assert_eq!(fk.attrs.column, "category_id");
        assert_eq!(fk.attrs.width, 3);
        let rel = fk.kind.relation().unwrap();
        assert_eq!(rel.table, "category");
        assert_eq!(rel.related_pk, "id");
        assert_eq!(rel.list_column.as_deref(), Some("title"));
        assert_eq!(rel.model_slug.as_deref(), Some("category"));

        let related = post.field_by_name("Related").unwrap();
        assert!(!related.attrs.list);
        assert_eq!(related.kind.relation().unwrap().model_slug.as_deref(), Some("blog-post"));

        let listed: Vec<_> = post.list_fields().map(|f| f.attrs.name.as_str()).collect();
        assert_eq!(listed, vec!["Id", "CategoryId", "Title", "Published", "Draft"]);
        assert!(post.field_by_name("Draft").unwrap().attrs.blank);

        assert_eq!(reg.groups().len(), 1);
        assert_eq!(reg.groups()[0].slug, "blog");
        assert_eq!(reg.groups()[0].models, vec!["category", "blog-post"]);
    }

    #[test]
    fn registration_order_does_not_matter() {
        let mut b = AdminBuilder::new();
        b.register("Blog", blog_post()).unwrap();
        b.register("Blog", category()).unwrap();
        let reg = b.build().unwrap();
        let fk = reg.get("blog-post").unwrap().field_by_name("CategoryId").unwrap();
        assert_eq!(fk.kind.relation().unwrap().model_slug.as_deref(), Some("category"));
        assert_eq!(fk.attrs.column, "CategoryId");
    }

    #[test]
    fn dangling_references_fail_loudly() {
        let mut b = AdminBuilder::new();
        b.register("Blog", blog_post()).unwrap();
        match b.build() {
            Err(ConfigError::DanglingReferences(refs)) => {
                assert_eq!(refs, vec!["BlogPost.CategoryId -> Category"]);
            }
            other => panic!("expected dangling references, got {other:?}"),
        }
    }

    #[test]
    fn first_member_cannot_be_skipped() {
        let mut b = AdminBuilder::new();
        let def = ModelDef::new("Category")
            .member(MemberDef::integer("Id").tag("-"))
            .member(MemberDef::text("Title"));
        let err = b.register("Blog", def).unwrap_err();
        assert_eq!(err.to_string(), "model Category: first column can't be skipped");
    }

    #[test]
    fn skipped_members_are_dropped() {
        let mut b = AdminBuilder::new();
        let def = ModelDef::new("Category")
            .member(MemberDef::integer("Id"))
            .member(MemberDef::text("Secret").tag("-"))
            .member(MemberDef::text("Title"));
        b.register("Blog", def).unwrap();
        let reg = b.build().unwrap();
        let names: Vec<_> = reg.get("category").unwrap().fields.iter().map(|f| f.attrs.name.clone()).collect();
        assert_eq!(names, vec!["Id", "Title"]);
    }

    #[test]
    fn sort_by_override() {
        let mut b = AdminBuilder::new();
        b.register("Blog", category().sort_by("-Title")).unwrap();
        b.register("Other", ModelDef::new("Tag").sort_by("Missing").member(MemberDef::integer("Id")))
            .unwrap();
        let reg = b.build().unwrap();
        assert_eq!(reg.get("category").unwrap().sort, Sort { field: "Title".into(), desc: true });
        assert_eq!(reg.get("tag").unwrap().sort, Sort { field: "Id".into(), desc: true });
    }

    #[test]
    fn option_errors_abort_registration() {
        let build = |member: MemberDef| {
            let mut b = AdminBuilder::new();
            b.register("G", ModelDef::new("M").member(MemberDef::integer("Id")).member(member))?;
            b.build()
        };
        assert!(matches!(
            build(MemberDef::text("Title").tag("width=13")),
            Err(ConfigError::InvalidOption { key: "width", .. })
        ));
        assert!(matches!(
            build(MemberDef::integer("Views").tag("default=many")),
            Err(ConfigError::InvalidOption { key: "default", .. })
        ));
        assert!(matches!(
            build(MemberDef::text("Title").tag("label='Oops")),
            Err(ConfigError::UnterminatedQuote { .. })
        ));
        assert!(matches!(
            build(MemberDef::text("Site").tag("field=colour")),
            Err(ConfigError::UnknownFieldType { .. })
        ));
    }

    #[test]
    fn defaults_are_typed() {
        let mut b = AdminBuilder::new();
        b.register(
            "G",
            ModelDef::new("M")
                .member(MemberDef::integer("Id"))
                .member(MemberDef::integer("Views").tag("default=10")),
        )
        .unwrap();
        let reg = b.build().unwrap();
        let views = reg.get("m").unwrap().field_by_name("Views").unwrap();
        assert_eq!(views.attrs.default, Some(Value::Int(10)));
    }

    #[derive(Debug)]
    struct Upper {
        prefix: String,
    }

    impl CustomField for Upper {
        fn configure(&self, options: &FieldOptions) -> Result<Arc<dyn CustomField>, ConfigError> {
            Ok(Arc::new(Upper {
                prefix: options.extra.get("prefix").cloned().unwrap_or_default(),
            }))
        }

        fn validate(&self, raw: &str) -> Result<Value, ValidationError> {
            Ok(Value::Text(format!("{}{}", self.prefix, raw.to_uppercase())))
        }
    }

    #[test]
    fn custom_fields_get_fresh_configuration() {
        let mut b = AdminBuilder::new();
        b.register_custom("upper", Arc::new(Upper { prefix: String::new() })).unwrap();
        b.register(
            "G",
            ModelDef::new("M")
                .member(MemberDef::integer("Id"))
                .member(MemberDef::text("A").tag("field=upper prefix=a-"))
                .member(MemberDef::text("B").tag("field=upper"))
                .member(MemberDef::text("Site").tag("field=url")),
        )
        .unwrap();
        let reg = b.build().unwrap();
        let m = reg.get("m").unwrap();
        assert_eq!(m.field_by_name("A").unwrap().validate("x").unwrap(), Value::from("a-X"));
        assert_eq!(m.field_by_name("B").unwrap().validate("x").unwrap(), Value::from("X"));
        assert!(matches!(m.field_by_name("Site").unwrap().kind, FieldKind::Url));
    }

    #[test]
    fn duplicate_models_are_rejected() {
        let mut b = AdminBuilder::new();
        b.register("A", category()).unwrap();
        b.register("B", category()).unwrap();
        assert!(matches!(b.build(), Err(ConfigError::DuplicateModel(_))));
    }

    #[test]
    fn unknown_kinds_become_text() {
        let mut b = AdminBuilder::new();
        b.register(
            "G",
            ModelDef::new("M")
                .member(MemberDef::integer("Id"))
                .member(MemberDef::new("Price", MemberKind::Unknown("decimal".into()))),
        )
        .unwrap();
        let reg = b.build().unwrap();
        assert!(matches!(reg.get("m").unwrap().field_by_name("Price").unwrap().kind, FieldKind::Text(_)));
    }

    #[test]
    fn loads_groups_from_json() {
        let groups = models_from_json(
            r#"[{"name": "Blog", "models": [
                {"type_name": "Category", "members": [
                    {"name": "Id", "kind": "integer"},
                    {"name": "Title", "kind": "text", "config": "list search"}
                ]}
            ]}]"#,
        )
        .unwrap();
        let mut b = AdminBuilder::new();
        b.register_groups(groups).unwrap();
        let reg = b.build().unwrap();
        assert_eq!(reg.get("category").unwrap().searchable_columns, vec!["Title"]);
        assert!(matches!(models_from_json("{"), Err(ConfigError::Load(_))));
    }
}
