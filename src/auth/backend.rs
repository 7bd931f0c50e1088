use crate::{
    auth::{login::SignInCreds, PermissionsTarget},
    error::{ClubError, LoginFailureReason},
    state::{
        db::ClubDB,
        db_objects::{AuthorisationBackendMember, DbMember},
    },
};
use axum_login::{AuthSession, AuthUser, AuthnBackend, AuthzBackend, UserId};
use std::collections::HashSet;

pub type Auth = AuthSession<ClubAuthBackend>;

impl AuthUser for AuthorisationBackendMember {
    type Id = String;

    fn id(&self) -> Self::Id {
        self.id.clone()
    }

    //there are no passwords, so changing the email is what invalidates old sessions
    fn session_auth_hash(&self) -> &[u8] {
        self.email.as_bytes()
    }
}

#[derive(Clone, Debug)]
pub struct ClubAuthBackend {
    db: ClubDB,
}

impl ClubAuthBackend {
    pub fn new(db: ClubDB) -> Self {
        Self { db }
    }

    pub async fn get_member(&self, id: &str) -> Result<Option<DbMember>, ClubError> {
        self.db.get_member(id).await
    }
}

#[async_trait::async_trait]
impl AuthnBackend for ClubAuthBackend {
    type User = AuthorisationBackendMember;
    type Credentials = SignInCreds;
    type Error = ClubError;

    async fn authenticate(
        &self,
        SignInCreds { email, password }: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        //any password goes, as long as there is one
        if password.is_empty() {
            return Err(ClubError::LoginFailure {
                reason: LoginFailureReason::MissingPassword,
            });
        }

        Ok(self
            .db
            .find_member_by_email(&email)
            .await?
            .map(Into::into))
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        self.db.get_member(user_id).await.map(|x| x.map(Into::into))
    }
}

#[async_trait::async_trait]
impl AuthzBackend for ClubAuthBackend {
    type Permission = PermissionsTarget;

    async fn get_group_permissions(
        &self,
        user: &Self::User,
    ) -> Result<HashSet<Self::Permission>, Self::Error> {
        //role is re-read so a demotion takes effect straight away
        let role = self
            .db
            .get_member(&user.id)
            .await?
            .map_or(user.role, |member| member.role);
        Ok(role.can())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::PermissionsRole, state::db::tests::memory_db};

    fn creds(email: &str, password: &str) -> SignInCreds {
        SignInCreds {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn demo_member_signs_in_with_any_password() {
        let db = memory_db().await;
        db.seed_demo_member("Demo User", "demo@example.com")
            .await
            .expect("seeding");
        let backend = ClubAuthBackend::new(db);

        let member = backend
            .authenticate(creds("demo@example.com", "literally anything"))
            .await
            .expect("no db errors")
            .expect("demo member should be found");

        assert_eq!(member.email, "demo@example.com");
        assert_eq!(member.name, "Demo User");
        assert_eq!(member.role, PermissionsRole::Admin);
    }

    #[tokio::test]
    async fn unknown_email_or_empty_password_fails() {
        let db = memory_db().await;
        db.seed_demo_member("Demo User", "demo@example.com")
            .await
            .expect("seeding");
        let backend = ClubAuthBackend::new(db);

        assert!(backend
            .authenticate(creds("nobody@example.com", "pw"))
            .await
            .expect("no db errors")
            .is_none());

        assert!(matches!(
            backend.authenticate(creds("demo@example.com", "")).await,
            Err(ClubError::LoginFailure {
                reason: LoginFailureReason::MissingPassword
            })
        ));
    }

    #[tokio::test]
    async fn admin_permissions_follow_the_stored_role() {
        let db = memory_db().await;
        let member = db
            .add_member("Bea", "bea@example.com", PermissionsRole::Member)
            .await
            .expect("adding member");
        let backend = ClubAuthBackend::new(db.clone());
        let user: AuthorisationBackendMember = member.clone().into();

        assert!(!backend
            .has_perm(&user, PermissionsTarget::ManageClub)
            .await
            .expect("perms"));

        db.save_member(&DbMember {
            role: PermissionsRole::Admin,
            ..member
        })
        .await
        .expect("promoting");

        assert!(backend
            .has_perm(&user, PermissionsTarget::ManageClub)
            .await
            .expect("perms"));
    }
}
