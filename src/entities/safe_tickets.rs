use sea_orm::entity::prelude::*;

/// Ticket mirrored from the SAFE service desk.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "safetickets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    #[sea_orm(column_name = "type")]
    pub ticket_type: String,
    pub status: String,
    pub account_name: Option<String>,
    pub machine: Option<String>,
    pub project: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub publickey: Option<String>,
    pub poc_firstname: Option<String>,
    pub poc_lastname: Option<String>,
    pub poc_email: Option<String>,
    pub source_account_id: Option<String>,
    pub source_allocation: Option<String>,
    pub gold_amount: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub extratext: Option<String>,
    pub startdate: Option<String>,
    pub enddate: Option<String>,
    pub creation_date: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
