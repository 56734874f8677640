mod common;

mod authorization {
    mod members {
        use crate::common::*;
        use fundbook::app::{db, domain::Role};
        use http::StatusCode;
        use tower::ServiceExt;

        #[tokio::test]
        async fn org_admin_sees_members() {
            let pool = test_pool().await;
            let admin = create_user(&pool, "clerk", Role::User).await;
            let member = create_user(&pool, "bookkeeper", Role::User).await;
            let org = create_org(&pool, "Riverside Fund", None).await;
            add_member(&pool, &org, &admin, Role::Admin, true).await;
            add_member(&pool, &org, &member, Role::User, true).await;
            let app = test_router(pool);
            let cookie = login(&app, "clerk", false).await;

            let response = app.oneshot(get_request("/settings/members", Some(&cookie))).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let body = body_string(response).await;
            assert!(body.contains("bookkeeper"));
            assert!(body.contains("clerk"));
        }

        #[tokio::test]
        async fn org_user_is_forbidden_even_if_globally_admin() {
            let pool = test_pool().await;
            let user = create_user(&pool, "bookkeeper", Role::Admin).await;
            let org = create_org(&pool, "Riverside Fund", None).await;
            add_member(&pool, &org, &user, Role::User, true).await;
            let app = test_router(pool);
            let cookie = login(&app, "bookkeeper", false).await;

            let response = app.oneshot(get_request("/settings/members", Some(&cookie))).await.unwrap();

            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }

        #[tokio::test]
        async fn superadmin_passes_admin_routes_as_org_user() {
            let pool = test_pool().await;
            let root = create_user(&pool, "root", Role::Superadmin).await;
            let org = create_org(&pool, "Riverside Fund", None).await;
            add_member(&pool, &org, &root, Role::User, true).await;
            let app = test_router(pool);
            let cookie = login(&app, "root", false).await;

            let response = app.oneshot(get_request("/settings/members", Some(&cookie))).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
        }

        #[tokio::test]
        async fn admin_removes_member_and_member_is_notified() {
            let pool = test_pool().await;
            let admin = create_user(&pool, "clerk", Role::User).await;
            let member = create_user(&pool, "bookkeeper", Role::User).await;
            add_contact(&pool, &member, "Bo", "Keeper", "bo@example.com").await;
            let org = create_org(&pool, "Riverside Fund", None).await;
            add_member(&pool, &org, &admin, Role::Admin, true).await;
            add_member(&pool, &org, &member, Role::User, true).await;
            let mailer = RecordingMailer::default();
            let app = test_router_with_mailer(pool.clone(), mailer.clone());
            let cookie = login(&app, "clerk", false).await;

            let uri = format!("/settings/members/{}/remove", member.as_str());
            let response = app.oneshot(form_request(&uri, String::new(), Some(&cookie))).await.unwrap();

            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert!(location(&response).starts_with("/settings/members?success="));
            assert!(default_orgs(&pool, &member).await.is_empty());

            let sent = mailer.messages();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].to.as_str(), "bo@example.com");
            assert!(sent[0].subject.contains("Riverside Fund"));
        }

        #[tokio::test]
        async fn admin_cannot_remove_themselves() {
            let pool = test_pool().await;
            let admin = create_user(&pool, "clerk", Role::User).await;
            let org = create_org(&pool, "Riverside Fund", None).await;
            add_member(&pool, &org, &admin, Role::Admin, true).await;
            let app = test_router(pool.clone());
            let cookie = login(&app, "clerk", false).await;

            let uri = format!("/settings/members/{}/remove", admin.as_str());
            let response = app.oneshot(form_request(&uri, String::new(), Some(&cookie))).await.unwrap();

            assert!(location(&response).starts_with("/settings/members?error="));
            assert_eq!(default_orgs(&pool, &admin).await, vec![org.as_str()]);
        }

        #[tokio::test]
        async fn last_admin_cannot_be_removed() {
            let pool = test_pool().await;
            let root = create_user(&pool, "root", Role::Superadmin).await;
            let admin = create_user(&pool, "clerk", Role::User).await;
            let org = create_org(&pool, "Riverside Fund", None).await;
            add_member(&pool, &org, &root, Role::User, true).await;
            add_member(&pool, &org, &admin, Role::Admin, true).await;
            let app = test_router(pool.clone());
            let cookie = login(&app, "root", false).await;

            let uri = format!("/settings/members/{}/remove", admin.as_str());
            let response = app.oneshot(form_request(&uri, String::new(), Some(&cookie))).await.unwrap();

            assert!(location(&response).starts_with("/settings/members?error="));
            assert_eq!(default_orgs(&pool, &admin).await, vec![org.as_str()]);
        }

        #[tokio::test]
        async fn org_superadmin_counts_as_an_admin_seat() {
            let pool = test_pool().await;
            let owner = create_user(&pool, "owner", Role::User).await;
            let admin = create_user(&pool, "clerk", Role::User).await;
            let org = create_org(&pool, "Riverside Fund", None).await;
            add_member(&pool, &org, &owner, Role::Superadmin, true).await;
            add_member(&pool, &org, &admin, Role::Admin, true).await;
            let app = test_router(pool.clone());
            let cookie = login(&app, "owner", false).await;

            let uri = format!("/settings/members/{}/remove", admin.as_str());
            let response = app.clone().oneshot(form_request(&uri, String::new(), Some(&cookie))).await.unwrap();

            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert!(location(&response).starts_with("/settings/members?success="));
            assert!(db::memberships::find(&pool, &admin, &org).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn plain_member_cannot_remove_anyone() {
            let pool = test_pool().await;
            let admin = create_user(&pool, "clerk", Role::User).await;
            let member = create_user(&pool, "bookkeeper", Role::User).await;
            let org = create_org(&pool, "Riverside Fund", None).await;
            add_member(&pool, &org, &admin, Role::Admin, true).await;
            add_member(&pool, &org, &member, Role::User, true).await;
            let app = test_router(pool.clone());
            let cookie = login(&app, "bookkeeper", false).await;

            let uri = format!("/settings/members/{}/remove", admin.as_str());
            let response = app.oneshot(form_request(&uri, String::new(), Some(&cookie))).await.unwrap();

            assert_eq!(response.status(), StatusCode::FORBIDDEN);
            assert_eq!(default_orgs(&pool, &admin).await, vec![org.as_str()]);
        }

        #[tokio::test]
        async fn members_of_other_orgs_are_not_found() {
            let pool = test_pool().await;
            let admin = create_user(&pool, "clerk", Role::User).await;
            let outsider = create_user(&pool, "outsider", Role::User).await;
            let org = create_org(&pool, "Riverside Fund", None).await;
            let other = create_org(&pool, "Hillside Fund", None).await;
            add_member(&pool, &org, &admin, Role::Admin, true).await;
            add_member(&pool, &other, &outsider, Role::User, true).await;
            let app = test_router(pool.clone());
            let cookie = login(&app, "clerk", false).await;

            let uri = format!("/settings/members/{}/remove", outsider.as_str());
            let response = app.oneshot(form_request(&uri, String::new(), Some(&cookie))).await.unwrap();

            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(default_orgs(&pool, &outsider).await, vec![other.as_str()]);
        }
    }

    mod accounts {
        use crate::common::*;
        use fundbook::app::domain::Role;
        use http::StatusCode;
        use tower::ServiceExt;

        #[tokio::test]
        async fn lists_only_active_org_accounts() {
            let pool = test_pool().await;
            let user = create_user(&pool, "treasurer", Role::User).await;
            let mine = create_org(&pool, "Riverside Fund", None).await;
            let theirs = create_org(&pool, "Hillside Fund", None).await;
            add_member(&pool, &mine, &user, Role::User, true).await;
            create_account(&pool, &mine, "Operating").await;
            create_account(&pool, &theirs, "Endowment").await;
            let app = test_router(pool);
            let cookie = login(&app, "treasurer", false).await;

            let response = app.oneshot(get_request("/accounts", Some(&cookie))).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let body = body_string(response).await;
            assert!(body.contains("Operating"));
            assert!(!body.contains("Endowment"));
        }

        #[tokio::test]
        async fn account_of_other_org_is_not_found() {
            let pool = test_pool().await;
            let user = create_user(&pool, "treasurer", Role::User).await;
            let mine = create_org(&pool, "Riverside Fund", None).await;
            let theirs = create_org(&pool, "Hillside Fund", None).await;
            add_member(&pool, &mine, &user, Role::User, true).await;
            let own = create_account(&pool, &mine, "Operating").await;
            let foreign = create_account(&pool, &theirs, "Endowment").await;
            let app = test_router(pool);
            let cookie = login(&app, "treasurer", false).await;

            let response = app
                .clone()
                .oneshot(get_request(&format!("/accounts/{}", own), Some(&cookie)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let response = app
                .oneshot(get_request(&format!("/accounts/{}", foreign), Some(&cookie)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    mod admin {
        use crate::common::*;
        use fundbook::app::domain::Role;
        use http::StatusCode;
        use tower::ServiceExt;

        #[tokio::test]
        async fn superadmin_lists_every_organization() {
            let pool = test_pool().await;
            let root = create_user(&pool, "root", Role::Superadmin).await;
            let own = create_org(&pool, "Admin Org", None).await;
            create_org(&pool, "Hillside Fund", Some("books.hillside.example")).await;
            add_member(&pool, &own, &root, Role::Admin, true).await;
            let app = test_router(pool);
            let cookie = login(&app, "root", false).await;

            let response = app.oneshot(get_request("/admin/organizations", Some(&cookie))).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let body = body_string(response).await;
            assert!(body.contains("Hillside Fund"));
            assert!(body.contains("books.hillside.example"));
        }

        #[tokio::test]
        async fn org_admin_is_not_superadmin() {
            let pool = test_pool().await;
            let admin = create_user(&pool, "clerk", Role::Admin).await;
            let org = create_org(&pool, "Riverside Fund", None).await;
            add_member(&pool, &org, &admin, Role::Admin, true).await;
            let app = test_router(pool);
            let cookie = login(&app, "clerk", false).await;

            let response = app.oneshot(get_request("/admin/organizations", Some(&cookie))).await.unwrap();

            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }

        #[tokio::test]
        async fn anonymous_is_sent_to_login() {
            let app = test_router(test_pool().await);

            let response = app.oneshot(get_request("/admin/organizations", None)).await.unwrap();

            assert_eq!(location(&response), "/login?redirectTo=%2Fadmin%2Forganizations");
        }
    }
}
