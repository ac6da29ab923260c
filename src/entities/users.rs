use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Institutional username or allocated mmm username (7 characters).
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,

    pub givenname: String,

    pub surname: Option<String>,

    pub email: String,

    #[sea_orm(column_type = "Text")]
    pub ssh_key: String,

    /// One of `pending`, `active`, `deactivated`.
    pub status: String,

    pub creation_date: String,

    pub modification_date: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
