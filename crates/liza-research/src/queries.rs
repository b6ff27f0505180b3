//! GraphQL documents sent to the analysis API.

pub const ANALYZE_KEYWORD_QUERY: &str = r"
  query AnalyzeKeyword($keyword: String!, $maxLongTails: Int) {
    analyzeKeyword(keyword: $keyword, maxLongTails: $maxLongTails) {
      keyword
      analyzedAt
      searchDemand {
        volume
        trendType
        momentum
        seasonalPeak
      }
      contentSupply {
        videoCount
        totalSearchResults
        contentGapScore
        competitionLevel
        avgCompetitorViews
        videosUploadedToday
        videosLast3Days
        videosThisWeek
        videosThisMonth
        videosThisYear
        isDormantOpportunity
        contentActivityLevel
      }
      scores {
        opportunity
        difficulty
        grade
      }
      recommendations {
        titlePatterns
        mustHaveTags
        optimalLengthSeconds
        topQuestions
        relatedKeywords
      }
    }
  }
";

pub const AUTOCOMPLETE_QUERY: &str = r"
  query GetAutocomplete($query: String!) {
    getAutocompleteSuggestions(query: $query) {
      youtube
      google
    }
  }
";

pub const TRENDING_KEYWORDS_QUERY: &str = r"
  query TrendingKeywords($regionCode: String) {
    trendingKeywords(regionCode: $regionCode) {
      keyword
      grade
      searchVolume
      opportunity
      difficulty
      trendingVideoCount
    }
  }
";

pub const TRENDING_VIDEOS_QUERY: &str = r"
  query TrendingVideos($regionCode: String) {
    trendingVideos(regionCode: $regionCode) {
      videoId
      title
      channelTitle
      thumbnailMedium
      viewCount
      likeCount
    }
  }
";

pub const LONG_TAIL_SUBSCRIPTION: &str = r"
  subscription OnLongTailAnalyzed($parentKeyword: String!) {
    onLongTailAnalyzed(parentKeyword: $parentKeyword) {
      parentKeyword
      longTailKeyword
      opportunity
      difficulty
      grade
      searchVolume
      competitionLevel
      videoCount
      avgCompetitorViews
      source
      isComplete
      analyzedCount
      totalCount
      allResults {
        keyword
        grade
        opportunity
        difficulty
        searchVolume
        source
      }
    }
  }
";

/// Response field holding the subscription payload inside `next.payload.data`.
pub const LONG_TAIL_FIELD: &str = "onLongTailAnalyzed";
