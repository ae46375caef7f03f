use aggmirror::access::{AccessModelBuilder, Discriminator};
use aggmirror::core::{Column, DataType, PersistenceError, Record, Result, TableDef};
use aggmirror::mirror::{RecordMirror, RecordMirrorRegistry};
use aggmirror::model::{
    DomainKind, DomainObject, DomainRef, DomainType, FieldDescriptor, FieldValue, IdentityType,
    TypeDescriptor, TypeModelRegistry, same_instance, unknown_field,
};
use std::any::Any;
use std::sync::Arc;

aggmirror::identity_type!(pub struct TeamId(i64););
aggmirror::identity_type!(pub struct MemberId(i64););

#[derive(Debug, Clone)]
struct Team {
    id: Option<TeamId>,
    name: String,
    members: Vec<Arc<Member>>,
    badge: Option<Arc<Badge>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Fault {
    None,
    Mapping,
    Configuration,
}

#[derive(Debug, Clone)]
struct Member {
    id: Option<MemberId>,
    name: String,
    team: Option<Arc<Team>>,
    mentor_team: Option<Arc<Team>>,
    fault: Fault,
}

#[derive(Debug, Clone)]
struct Badge {
    label: String,
}

impl DomainType for Team {
    const TYPE_NAME: &'static str = "Team";
}

impl DomainObject for Team {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn field_value(&self, field: &str) -> Result<FieldValue> {
        Ok(match field {
            "id" => FieldValue::identity(&self.id),
            "name" => FieldValue::scalar(self.name.as_str()),
            "members" => FieldValue::collection(&self.members),
            "badge" => FieldValue::optional(&self.badge),
            "DIRECTORY" => {
                return Err(PersistenceError::Configuration(
                    "static fields must not be read".to_string(),
                ));
            }
            _ => return Err(unknown_field(Self::TYPE_NAME, field)),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DomainType for Member {
    const TYPE_NAME: &'static str = "Member";
}

impl DomainObject for Member {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn field_value(&self, field: &str) -> Result<FieldValue> {
        Ok(match field {
            "id" => FieldValue::identity(&self.id),
            "name" => FieldValue::scalar(self.name.as_str()),
            "team" => FieldValue::optional(&self.team),
            "mentor_team" => FieldValue::optional(&self.mentor_team),
            "history" => match self.fault {
                Fault::None => FieldValue::Collection(Vec::new()),
                Fault::Mapping => {
                    return Err(PersistenceError::Mapping("history unavailable".to_string()));
                }
                Fault::Configuration => {
                    return Err(PersistenceError::Configuration("history unmapped".to_string()));
                }
            },
            _ => return Err(unknown_field(Self::TYPE_NAME, field)),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl DomainType for Badge {
    const TYPE_NAME: &'static str = "Badge";
}

impl DomainObject for Badge {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn field_value(&self, field: &str) -> Result<FieldValue> {
        match field {
            "label" => Ok(FieldValue::scalar(self.label.as_str())),
            _ => Err(unknown_field(Self::TYPE_NAME, field)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct TeamMirror(Arc<TableDef>);

impl RecordMirror for TeamMirror {
    type Domain = Team;
    type Root = Team;
    type Builder = Team;

    fn table_def(&self) -> &Arc<TableDef> {
        &self.0
    }

    fn record_to_domain_object_builder(&self, _record: Option<&Record>) -> Result<Option<Team>> {
        Ok(None)
    }

    fn from(&self, team: &Team, _root: &Team) -> Result<Record> {
        Record::new(self.0.clone())
            .with("ID", team.id.as_ref().map(|id| id.0))?
            .with("NAME", team.name.as_str())
    }
}

struct MemberMirror(Arc<TableDef>);

impl RecordMirror for MemberMirror {
    type Domain = Member;
    type Root = Team;
    type Builder = Member;

    fn table_def(&self) -> &Arc<TableDef> {
        &self.0
    }

    fn record_to_domain_object_builder(&self, _record: Option<&Record>) -> Result<Option<Member>> {
        Ok(None)
    }

    fn from(&self, member: &Member, root: &Team) -> Result<Record> {
        Record::new(self.0.clone())
            .with("ID", member.id.as_ref().map(|id| id.0))?
            .with("TEAM_ID", root.id.as_ref().map(|id| id.0))?
            .with("NAME", member.name.as_str())
    }
}

fn type_model() -> TypeModelRegistry {
    TypeModelRegistry::new()
        .register(
            TypeDescriptor::aggregate_root("Team")
                .field(FieldDescriptor::identity("id", TeamId::TYPE_NAME))
                .field(FieldDescriptor::scalar("name"))
                .field(FieldDescriptor::entity("members", "Member").list())
                .field(FieldDescriptor::value_object("badge", "Badge").optional())
                .field(FieldDescriptor::entity("DIRECTORY", "Member").list().static_field()),
        )
        .register(
            TypeDescriptor::entity("Member")
                .field(FieldDescriptor::identity("id", MemberId::TYPE_NAME))
                .field(FieldDescriptor::scalar("name"))
                .field(FieldDescriptor::aggregate_root("team", "Team").optional())
                .field(FieldDescriptor::aggregate_root("mentor_team", "Team").optional())
                .field(FieldDescriptor::entity("history", "Member").list()),
        )
        .register(TypeDescriptor::value_object("Badge").field(FieldDescriptor::scalar("label")))
}

fn builder() -> AccessModelBuilder {
    let team_table = Arc::new(
        TableDef::new("TEAM")
            .column(Column::new("ID", DataType::Integer).not_null())
            .column(Column::new("NAME", DataType::Text))
            .primary_key(&["ID"]),
    );
    let member_table = Arc::new(
        TableDef::new("MEMBER")
            .column(Column::new("ID", DataType::Integer).not_null())
            .column(Column::new("TEAM_ID", DataType::Integer))
            .column(Column::new("NAME", DataType::Text))
            .primary_key(&["ID"]),
    );
    let mirrors = RecordMirrorRegistry::new()
        .register(TeamMirror(team_table))
        .register(MemberMirror(member_table));
    AccessModelBuilder::new(Arc::new(type_model()), Arc::new(mirrors))
}

fn member(id: Option<i64>, name: &str) -> Member {
    Member {
        id: id.map(MemberId),
        name: name.to_string(),
        team: None,
        mentor_team: None,
        fault: Fault::None,
    }
}

fn team(id: i64, members: Vec<Member>) -> Team {
    Team {
        id: Some(TeamId(id)),
        name: format!("team-{}", id),
        members: members.into_iter().map(Arc::new).collect(),
        badge: Some(Arc::new(Badge {
            label: "gold".to_string(),
        })),
    }
}

#[test]
fn test_builds_positions_and_mappers() {
    let root: DomainRef = Arc::new(team(1, vec![member(Some(10), "ann"), member(Some(11), "bob")]));
    let model = builder().build_access_model(root.clone()).unwrap();

    assert!(model.is_root());
    assert!(model.is_entity());
    assert_eq!(model.kind(), DomainKind::AggregateRoot);
    assert!(same_instance(model.instance(), &root));
    assert_eq!(model.record_mirror().unwrap().record_type(), "TEAM");

    // two members and the badge; the static DIRECTORY field is never read
    assert_eq!(model.children().len(), 3);
    let badge = &model.children()[2];
    assert!(badge.is_value_object());
    assert!(!badge.is_record_mapped());

    let ann = &model.children()[0];
    assert_eq!(ann.position().accessor_from_parent(), "members");
    assert_eq!(ann.position().access_path_from_root().len(), 1);
    assert!(same_instance(ann.position().root_instance(), &root));
    assert_eq!(ann.key().to_string(), "Team[1]/members:Member[10]");
    assert_eq!(model.all_contained().len(), 4);
    assert_eq!(model.record_mapped_count(), 3);
}

#[test]
fn test_back_reference_to_root_is_not_descended() {
    let original = team(1, vec![]);
    let mut ann = member(Some(10), "ann");
    ann.team = Some(Arc::new(original.clone()));
    let root = Team {
        members: vec![Arc::new(ann)],
        ..original
    };

    let model = builder().build_access_model(Arc::new(root)).unwrap();
    let ann = &model.children()[0];
    assert_eq!(ann.children().len(), 1);

    let back = &ann.children()[0];
    assert!(back.position().is_back_reference());
    assert!(back.children().is_empty());
    assert!(!back.is_record_mapped());
}

#[test]
fn test_reference_to_other_aggregate_is_descended() {
    let mut ann = member(Some(10), "ann");
    ann.mentor_team = Some(Arc::new(team(2, vec![member(Some(20), "cat")])));
    let model = builder()
        .build_access_model(Arc::new(team(1, vec![ann])))
        .unwrap();

    let mentor = &model.children()[0].children()[0];
    assert!(!mentor.position().is_back_reference());
    assert_eq!(mentor.kind(), DomainKind::AggregateRoot);
    assert_eq!(mentor.children().len(), 2);
    assert_eq!(
        mentor.children()[0].position().accessor_path(),
        vec!["members", "mentor_team", "members"]
    );
}

#[test]
fn test_value_object_root_is_rejected() {
    let badge: DomainRef = Arc::new(Badge {
        label: "gold".to_string(),
    });
    let err = builder().build_access_model(badge).unwrap_err();
    assert!(matches!(err, PersistenceError::Configuration(_)));
}

#[test]
fn test_failing_field_branch_is_skipped() {
    let mut ann = member(Some(10), "ann");
    ann.fault = Fault::Mapping;
    let model = builder()
        .build_access_model(Arc::new(team(1, vec![ann, member(Some(11), "bob")])))
        .unwrap();
    assert_eq!(model.children().len(), 3);
}

#[test]
fn test_configuration_error_aborts_build() {
    let mut ann = member(Some(10), "ann");
    ann.fault = Fault::Configuration;
    let result = builder().build_access_model(Arc::new(team(1, vec![ann])));
    assert!(matches!(result, Err(PersistenceError::Configuration(_))));
}

#[test]
fn test_independent_builds_compare_structurally() {
    let a = builder()
        .build_access_model(Arc::new(team(1, vec![member(Some(10), "ann")])))
        .unwrap();
    let b = builder()
        .build_access_model(Arc::new(team(1, vec![member(Some(10), "renamed")])))
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(a.children()[0], b.children()[0]);
    assert!(!same_instance(a.instance(), b.instance()));
}

#[test]
fn test_transient_entities_get_distinct_positions() {
    let model = builder()
        .build_access_model(Arc::new(team(1, vec![member(None, "x"), member(None, "x")])))
        .unwrap();
    let first = &model.children()[0];
    let second = &model.children()[1];

    assert_ne!(first, second);
    assert!(matches!(
        first.key().segments()[1].discriminator,
        Discriminator::Transient(_)
    ));
}

#[test]
fn test_equal_value_objects_differ_by_occurrence() {
    #[derive(Debug)]
    struct Shelf(Vec<Arc<Badge>>);

    impl DomainType for Shelf {
        const TYPE_NAME: &'static str = "Shelf";
    }

    impl DomainObject for Shelf {
        fn type_name(&self) -> &'static str {
            "Shelf"
        }

        fn field_value(&self, field: &str) -> Result<FieldValue> {
            match field {
                "id" => Ok(FieldValue::scalar(1)),
                "badges" => Ok(FieldValue::collection(&self.0)),
                _ => Err(unknown_field("Shelf", field)),
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    let types = type_model().register(
        TypeDescriptor::aggregate_root("Shelf")
            .field(FieldDescriptor::identity("id", "ShelfId"))
            .field(FieldDescriptor::value_object("badges", "Badge").list()),
    );
    let builder = AccessModelBuilder::new(Arc::new(types), Arc::new(RecordMirrorRegistry::new()));
    let badge = || {
        Arc::new(Badge {
            label: "gold".to_string(),
        })
    };
    let model = builder
        .build_access_model(Arc::new(Shelf(vec![badge(), badge()])))
        .unwrap();

    let keys: Vec<String> = model.children().iter().map(|c| c.key().to_string()).collect();
    assert_eq!(
        keys,
        vec!["Shelf[1]/badges:Badge[<'gold'>]", "Shelf[1]/badges:Badge[<'gold'>]#1"]
    );
}
