// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table PostgreSQL avec SeaORM.
//
// Liste des modules:
//   - health : Health check API
//   - users : Utilisateurs (lecture seule ici, l'auth vit ailleurs)
//   - event : Événements (slug unique, dates)
//   - activity : Activités d'un événement (obligatoire / payante)
//   - event_registration : Inscription d'un utilisateur à un événement
//   - product : Produits achetables (billets, jetons, articles physiques)
//   - access_target : Cible d'accès d'un produit (événement ou activité)
//   - purchase : Enregistrement immuable d'un achat
//   - user_product : Possession d'un produit par un bénéficiaire
//   - user_token : Jeton d'activité individuel (1 ligne = 1 jeton)
//   - activity_registration : Accès d'un utilisateur à une activité
//   - pending_pix_purchase : Achat Pix en attente de confirmation webhook
//   - payment_incident : Incident de compensation (suivi opérateur)
//   - dto : Data Transfer Objects pour les requêtes/réponses API
//
// Points d'attention:
//   - Tous les modèles utilisent SeaORM (pas de SQL brut)
//   - purchase / user_product / user_token / activity_registration ne sont
//     créés que par le moteur d'achat, dans une transaction unique
//
// ============================================================================

pub mod health;
pub mod users;
pub mod event;
pub mod activity;
pub mod event_registration;
pub mod product;
pub mod access_target;
pub mod purchase;
pub mod user_product;
pub mod user_token;
pub mod activity_registration;
pub mod pending_pix_purchase;
pub mod payment_incident;
pub mod dto;
