use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Creates an `id` + `user_id` + `<item>_id` + timestamp table.
fn user_item_table(
    table: &'static str,
    item_column: &'static str,
    item_table: &'static str,
    time_column: &'static str,
) -> TableCreateStatement {
    Table::create()
        .table(table)
        .if_not_exists()
        .col(
            ColumnDef::new("id")
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new("user_id").integer().not_null())
        .col(ColumnDef::new(item_column).integer().not_null())
        .col(ColumnDef::new(time_column).timestamp().not_null())
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{table}_user_id"))
                .from(table, "user_id")
                .to("users", "id")
                .on_delete(ForeignKeyAction::Cascade),
        )
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{table}_{item_column}"))
                .from(table, item_column)
                .to(item_table, "id")
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(user_item_table(
                "bought_albums",
                "item_id",
                "albums",
                "created_at",
            ))
            .await?;
        manager
            .create_table(user_item_table(
                "bought_tracks",
                "item_id",
                "tracks",
                "created_at",
            ))
            .await?;
        manager
            .create_table(user_item_table(
                "like_tracks",
                "track_id",
                "tracks",
                "like_time",
            ))
            .await?;
        manager
            .create_table(user_item_table(
                "listen_tracks",
                "track_id",
                "tracks",
                "listen_time",
            ))
            .await?;

        // One purchase per user and item, one like per user and track
        // (listens stay non-unique)
        for (name, table, column) in [
            ("idx_bought_albums_user_item", "bought_albums", "item_id"),
            ("idx_bought_tracks_user_item", "bought_tracks", "item_id"),
            ("idx_like_tracks_user_track", "like_tracks", "track_id"),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(table)
                        .col("user_id")
                        .col(column)
                        .unique()
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_index(
                Index::create()
                    .name("idx_listen_tracks_user_track")
                    .table("listen_tracks")
                    .col("user_id")
                    .col("track_id")
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in ["listen_tracks", "like_tracks", "bought_tracks", "bought_albums"] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }

        Ok(())
    }
}
