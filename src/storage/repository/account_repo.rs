use crate::storage::entity::account::{self, ActiveModel as AccountActiveModel, Entity as Account};
use crate::storage::entity::account_prompt_binding::{
    self, ActiveModel as BindingActiveModel, Entity as AccountPromptBinding,
};
use crate::storage::entity::prompt_template::{
    ActiveModel as TemplateActiveModel, Entity as PromptTemplate,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};

pub struct AccountRepository;

impl AccountRepository {
    pub async fn create_account(
        db: &DatabaseConnection,
        name: &str,
        api_key: &str,
        base_url: &str,
        model: &str,
    ) -> Result<i32, DbErr> {
        let saved = AccountActiveModel {
            name: Set(name.to_string()),
            api_key: Set(api_key.to_string()),
            base_url: Set(base_url.to_string()),
            model: Set(model.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(saved.id)
    }

    pub async fn find_by_id(
        db: &DatabaseConnection,
        id: i32,
    ) -> Result<Option<account::Model>, DbErr> {
        Account::find_by_id(id).one(db).await
    }

    pub async fn create_template(
        db: &DatabaseConnection,
        name: &str,
        system_template_text: Option<String>,
    ) -> Result<i32, DbErr> {
        let saved = TemplateActiveModel {
            name: Set(name.to_string()),
            system_template_text: Set(system_template_text),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(saved.id)
    }

    /// 每个账号只保留一条绑定，重复绑定时覆盖
    pub async fn bind_template(
        db: &DatabaseConnection,
        account_id: i32,
        template_id: Option<i32>,
    ) -> Result<(), DbErr> {
        let existing = AccountPromptBinding::find()
            .filter(account_prompt_binding::Column::AccountId.eq(account_id))
            .one(db)
            .await?;
        match existing {
            Some(b) => {
                let mut update: BindingActiveModel = b.into();
                update.prompt_template_id = Set(template_id);
                update.update(db).await?;
            }
            None => {
                BindingActiveModel {
                    account_id: Set(account_id),
                    prompt_template_id: Set(template_id),
                    ..Default::default()
                }
                .insert(db)
                .await?;
            }
        }
        Ok(())
    }

    /// 账号绑定模板的 system prompt；没有绑定、模板缺失或文本为空时返回 None
    pub async fn resolve_system_prompt(
        db: &DatabaseConnection,
        account_id: i32,
    ) -> Result<Option<String>, DbErr> {
        let binding = AccountPromptBinding::find()
            .filter(account_prompt_binding::Column::AccountId.eq(account_id))
            .one(db)
            .await?;
        let Some(template_id) = binding.and_then(|b| b.prompt_template_id) else {
            return Ok(None);
        };
        let template = PromptTemplate::find_by_id(template_id).one(db).await?;
        Ok(template
            .and_then(|t| t.system_template_text)
            .filter(|text| !text.trim().is_empty()))
    }
}
