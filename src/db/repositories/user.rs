use sea_orm::sea_query::{Alias, Expr, Order, Query};
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::constants::accounts::MMM_PREFIX;
use crate::domain::{AccountStatus, DuplicateKey};
use crate::entities::{prelude::*, users};

/// User data without the SSH key, which is too large to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub username: String,
    pub givenname: String,
    pub surname: Option<String>,
    pub email: String,
    pub status: String,
    pub creation_date: String,
    pub modification_date: Option<String>,
}

impl From<users::Model> for UserSummary {
    fn from(model: users::Model) -> Self {
        Self {
            username: model.username,
            givenname: model.givenname,
            surname: model.surname,
            email: model.email,
            status: model.status,
            creation_date: model.creation_date,
            modification_date: model.modification_date,
        }
    }
}

/// Values for a new `users` row.
pub struct UserInsert<'u> {
    pub username: &'u str,
    pub given_name: &'u str,
    pub surname: Option<&'u str>,
    pub email: &'u str,
    pub ssh_key: &'u str,
    pub status: AccountStatus,
}

pub struct UserRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get(&self, username: &str) -> Result<Option<users::Model>, DbErr> {
        Users::find_by_id(username.to_string()).one(self.conn).await
    }

    /// Users whose `key` field equals `value`. The column comes from the
    /// enum, never from caller text.
    pub async fn find_by(&self, key: DuplicateKey, value: &str) -> Result<Vec<UserSummary>, DbErr> {
        let column = match key {
            DuplicateKey::Username => users::Column::Username,
            DuplicateKey::Email => users::Column::Email,
        };

        let rows = Users::find()
            .filter(column.eq(value))
            .order_by_asc(users::Column::CreationDate)
            .all(self.conn)
            .await?;

        Ok(rows.into_iter().map(UserSummary::from).collect())
    }

    pub async fn insert(&self, user: &UserInsert<'_>) -> Result<(), DbErr> {
        let active_model = users::ActiveModel {
            username: Set(user.username.to_string()),
            givenname: Set(user.given_name.to_string()),
            surname: user.surname.map_or(NotSet, |s| Set(Some(s.to_string()))),
            email: Set(user.email.to_string()),
            ssh_key: Set(user.ssh_key.to_string()),
            status: Set(user.status.as_str().to_string()),
            creation_date: Set(crate::db::now()),
            modification_date: NotSet,
        };

        Users::insert(active_model)
            .exec_without_returning(self.conn)
            .await?;
        Ok(())
    }

    pub async fn set_status(&self, username: &str, status: AccountStatus) -> Result<u64, DbErr> {
        let result = Users::update_many()
            .col_expr(users::Column::Status, Expr::value(status.as_str()))
            .col_expr(users::Column::ModificationDate, Expr::value(crate::db::now()))
            .filter(users::Column::Username.eq(username))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected)
    }

    /// Greatest mmm username in the local `users` table and in the `users`
    /// table of each extra schema (other clusters sharing the range).
    pub async fn last_mmm_username(&self, extra_schemas: &[String]) -> Result<Option<String>, DbErr> {
        let pattern = format!("{MMM_PREFIX}%");

        let mut best: Option<String> = Users::find()
            .select_only()
            .column(users::Column::Username)
            .filter(users::Column::Username.like(pattern.as_str()))
            .order_by_desc(users::Column::Username)
            .limit(1)
            .into_tuple()
            .one(self.conn)
            .await?;

        let backend = self.conn.get_database_backend();
        for schema in extra_schemas {
            let select = Query::select()
                .column(Alias::new("username"))
                .from((Alias::new(schema.as_str()), Alias::new("users")))
                .and_where(Expr::col(Alias::new("username")).like(pattern.as_str()))
                .order_by(Alias::new("username"), Order::Desc)
                .limit(1)
                .to_owned();

            if let Some(row) = self.conn.query_one(backend.build(&select)).await? {
                let username: String = row.try_get("", "username")?;
                if best.as_ref().is_none_or(|b| username > *b) {
                    best = Some(username);
                }
            }
        }

        Ok(best)
    }

    /// Partial-match search; empty criteria match everything.
    pub async fn whois(
        &self,
        username: &str,
        email: &str,
        given_name: &str,
        surname: &str,
    ) -> Result<Vec<UserSummary>, DbErr> {
        let like = |s: &str| format!("%{s}%");

        let mut query = Users::find()
            .filter(users::Column::Username.like(like(username)))
            .filter(users::Column::Email.like(like(email)))
            .filter(users::Column::Givenname.like(like(given_name)));

        // NULL surnames only match when no surname was asked for
        if !surname.is_empty() {
            query = query.filter(users::Column::Surname.like(like(surname)));
        }

        let rows = query
            .order_by_asc(users::Column::Username)
            .all(self.conn)
            .await?;

        Ok(rows.into_iter().map(UserSummary::from).collect())
    }
}
