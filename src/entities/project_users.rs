use sea_orm::entity::prelude::*;

/// Membership of a user in a project, sponsored by a point of contact.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "projectusers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub username: String,
    pub project: String,
    pub poc_id: String,
    pub status: String,
    pub creation_date: String,
    pub modification_date: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
