//! The site's hand-authored chapter table.

use crate::catalog::{Catalog, Chapter, DocumentBody};

pub const DEFAULT_TRACK_ALIAS: &str = "tutorial-react";
pub const FIRST_LESSON_ALIAS: &str = "get-started";

pub fn builtin() -> anyhow::Result<Catalog> {
    Catalog::new(vec![
        Chapter::new("introduction", "Introduction", false)
            .subchapter(
                "welcome",
                "Welcome",
                DocumentBody::inline(
                    "# Welcome\n\nA hands-on tutorial for the Apollo GraphQL client.\n\n\
                     ## What you will build\n\nA Pokedex app backed by a hosted GraphQL server.\n\n\
                     ## How this tutorial works\n\nPick a track in the sidebar and follow it step by step.\n",
                ),
            )
            .subchapter(
                "graphql-basics",
                "GraphQL Basics",
                DocumentBody::inline(
                    "# GraphQL Basics\n\n## Queries\n\nAsk for exactly the fields you need.\n\n\
                     ### Arguments\n\nFields can take arguments.\n\n## Mutations\n\nChange data on the server.\n",
                ),
            ),
        Chapter::new("tutorial-react", "React", true)
            .subchapter(
                "get-started",
                "Getting Started",
                DocumentBody::inline(
                    "# Getting Started\n\n## Create your GraphQL server\n\nSign in to get a personal backend.\n\n\
                     ## Download the starter code\n\nClone the starter project and install dependencies.\n",
                ),
            )
            .subchapter(
                "react-01",
                "Queries with Apollo",
                DocumentBody::inline(
                    "# Queries with Apollo\n\n## Setting up the client\n\nCreate an `ApolloClient` instance.\n\n\
                     ## Running a query\n\nWrap a component with `graphql`.\n\n### Loading state\n\nShow a spinner.\n",
                ),
            )
            .subchapter(
                "react-02",
                "Mutations",
                DocumentBody::inline(
                    "# Mutations\n\n## Adding a Pokemon\n\nSend a `createPokemon` mutation.\n\n\
                     ## Updating the cache\n\nRefetch or update the store after the mutation.\n",
                ),
            )
            .subchapter(
                "react-03",
                "Pagination",
                DocumentBody::inline(
                    "# Pagination\n\n## First and skip\n\nPage through results.\n\n## Fetch more\n\nLoad the next page on demand.\n",
                ),
            ),
        Chapter::new("tutorial-angular", "Angular", true)
            .subchapter(
                "angular-01",
                "Queries with Apollo",
                DocumentBody::inline(
                    "# Queries with Apollo\n\n## Setting up the client\n\nProvide the client to the app module.\n\n\
                     ## Using watchQuery\n\nSubscribe to query results.\n",
                ),
            )
            .subchapter(
                "angular-02",
                "Mutations",
                DocumentBody::inline("# Mutations\n\n## Calling mutate\n\nSend the mutation.\n"),
            ),
        Chapter::new("go-further", "Go Further", false)
            .subchapter(
                "authentication",
                "Authentication",
                DocumentBody::inline(
                    "# Authentication\n\n## Tokens\n\nAttach a token to every request.\n\n\
                     ## Permissions\n\nRestrict who can read and write.\n",
                ),
            )
            .subchapter(
                "next-steps",
                "Next Steps",
                DocumentBody::inline("# Next Steps\n\nKeep learning with the community.\n"),
            ),
    ])
}
