use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{EntityTrait, Schema};

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn create<E>(manager: &SchemaManager<'_>, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    manager
        .create_table(
            schema
                .create_table_from_entity(entity)
                .if_not_exists()
                .to_owned(),
        )
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        create(manager, &schema, Institutes).await?;
        create(manager, &schema, Projects).await?;
        create(manager, &schema, PointsOfContact).await?;
        create(manager, &schema, Users).await?;
        create(manager, &schema, ProjectUsers).await?;
        // requests references users
        create(manager, &schema, Requests).await?;
        create(manager, &schema, SafeTickets).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_projectusers_username_status")
                    .table(ProjectUsers)
                    .col(crate::entities::project_users::Column::Username)
                    .col(crate::entities::project_users::Column::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requests_cluster_isdone")
                    .table(Requests)
                    .col(crate::entities::requests::Column::Cluster)
                    .col(crate::entities::requests::Column::Isdone)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SafeTickets).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Requests).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProjectUsers).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PointsOfContact).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Institutes).to_owned())
            .await?;

        Ok(())
    }
}
