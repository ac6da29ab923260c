use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::AccountStatus;
use crate::entities::{prelude::*, project_users, projects};

/// Projects and the project-user memberships hanging off them.
pub struct ProjectRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> ProjectRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn add_project(&self, project: &str, institute_id: &str) -> Result<(), DbErr> {
        let active_model = projects::ActiveModel {
            project: Set(project.to_string()),
            institute_id: Set(institute_id.to_string()),
            status: Set(AccountStatus::Active.as_str().to_string()),
            creation_date: Set(crate::db::now()),
            modification_date: NotSet,
        };

        Projects::insert(active_model)
            .exec_without_returning(self.conn)
            .await?;
        Ok(())
    }

    pub async fn get_project(&self, project: &str) -> Result<Option<projects::Model>, DbErr> {
        Projects::find_by_id(project.to_string()).one(self.conn).await
    }

    pub async fn add_member(
        &self,
        username: &str,
        project: &str,
        poc_id: &str,
        status: AccountStatus,
    ) -> Result<i32, DbErr> {
        let active_model = project_users::ActiveModel {
            username: Set(username.to_string()),
            project: Set(project.to_string()),
            poc_id: Set(poc_id.to_string()),
            status: Set(status.as_str().to_string()),
            creation_date: Set(crate::db::now()),
            ..Default::default()
        };

        let res = ProjectUsers::insert(active_model).exec(self.conn).await?;
        Ok(res.last_insert_id)
    }

    pub async fn memberships(&self, username: &str) -> Result<Vec<project_users::Model>, DbErr> {
        ProjectUsers::find()
            .filter(project_users::Column::Username.eq(username))
            .order_by_asc(project_users::Column::CreationDate)
            .all(self.conn)
            .await
    }

    /// Flips every pending membership of `username` to active.
    pub async fn activate_pending(&self, username: &str) -> Result<u64, DbErr> {
        let result = ProjectUsers::update_many()
            .col_expr(
                project_users::Column::Status,
                Expr::value(AccountStatus::Active.as_str()),
            )
            .col_expr(
                project_users::Column::ModificationDate,
                Expr::value(crate::db::now()),
            )
            .filter(project_users::Column::Username.eq(username))
            .filter(project_users::Column::Status.eq(AccountStatus::Pending.as_str()))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected)
    }
}
