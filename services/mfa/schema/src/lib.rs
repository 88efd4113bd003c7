pub mod verification_challenges;
